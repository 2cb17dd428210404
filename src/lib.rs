//! Tracks how much time is spent on a coding-practice site, split into active and idle time,
//! together with the problems solved each day. The tracker runs next to the browser, the
//! server keeps the daily records and the cli prints them.
//!

pub mod cli;
pub mod daemon;
pub mod gateway;
pub mod server;
pub mod storage;
pub mod utils;
