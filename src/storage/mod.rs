//!  Storage of daily aggregates, organized through [record_storage::RecordStorageImpl].
//!  The basic idea is:
//!   - There is a directory with all the records.
//!   - Each local calendar date has exactly one JSON file holding the full record.
//!   - Writes replace the whole record, they never merge.

pub mod entities;
pub mod record_storage;
