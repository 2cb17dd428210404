//! Daily aggregation. [tracker::Tracker] is the synchronous state machine, [module::TrackingModule]
//! drives it from inbound messages and timers.

pub mod idle;
pub mod module;
pub mod session;
pub mod timers;
pub mod tracker;
