use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::storage::{
    entities::{DailyRecord, StatsPayload},
    record_storage::{RecordStorage, RecordStorageImpl},
};

use super::StatsGateway;

/// File names of the local mirror are `leetcode_stats_<date>.json`.
pub const LOCAL_RECORD_PREFIX: &str = "leetcode_stats_";

/// Keeps records on the local disk. Used as a mirror of the remote store and as the only store
/// when running offline.
pub struct LocalGateway<R: RecordStorage> {
    storage: R,
}

impl LocalGateway<RecordStorageImpl> {
    pub fn in_dir(dir: PathBuf) -> Result<Self> {
        let storage = RecordStorageImpl::new(dir)?.with_prefix(LOCAL_RECORD_PREFIX);
        Ok(Self::new(storage))
    }
}

impl<R: RecordStorage> LocalGateway<R> {
    pub fn new(storage: R) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<R: RecordStorage + Send + Sync> StatsGateway for LocalGateway<R> {
    async fn upsert(&self, record: DailyRecord) -> Result<DailyRecord> {
        let payload = StatsPayload {
            record,
            is_new_day: false,
        };
        Ok(self.storage.upsert(payload, Utc::now()).await?.record)
    }

    async fn open_day(&self, date: NaiveDate) -> Result<DailyRecord> {
        let payload = StatsPayload {
            record: DailyRecord::empty(date),
            is_new_day: true,
        };
        Ok(self.storage.upsert(payload, Utc::now()).await?.record)
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>> {
        Ok(self.storage.get(date).await?.map(|v| v.record))
    }

    async fn list(&self) -> Result<Vec<DailyRecord>> {
        Ok(self
            .storage
            .list()
            .await?
            .into_iter()
            .map(|v| v.record)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{gateway::StatsGateway, storage::entities::DailyRecord};

    use super::LocalGateway;

    #[tokio::test]
    async fn test_local_gateway_uses_prefixed_files() -> Result<()> {
        let dir = tempdir()?;
        let gateway = LocalGateway::in_dir(dir.path().to_owned())?;
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let mut record = DailyRecord::empty(date);
        record.idle_time_spent = 60_000;
        gateway.upsert(record.clone()).await?;

        assert!(dir.path().join("leetcode_stats_2024-01-15.json").exists());
        assert_eq!(gateway.get(date).await?, Some(record.clone()));
        assert_eq!(gateway.open_day(date).await?, record);
        assert_eq!(gateway.list().await?, vec![record]);
        Ok(())
    }
}
