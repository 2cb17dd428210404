//! Contains the persistence side the tracker talks to. [StatsGateway] is the main artifact of
//! this module, realized by the remote store client, the local file mirror, and a combination
//! of both.

pub mod fallback;
pub mod http;
pub mod local;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::storage::entities::DailyRecord;

/// Where daily records are kept. Callers treat every failure as transient: they log it and
/// try again on the next natural write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsGateway: Send + Sync {
    /// Full replace keyed by the record date.
    async fn upsert(&self, record: DailyRecord) -> Result<DailyRecord>;

    /// Makes sure a record exists for the date without touching an existing one.
    async fn open_day(&self, date: NaiveDate) -> Result<DailyRecord>;

    async fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>>;

    /// All records, newest date first.
    async fn list(&self) -> Result<Vec<DailyRecord>>;
}
