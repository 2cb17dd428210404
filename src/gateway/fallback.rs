use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;

use crate::storage::entities::DailyRecord;

use super::StatsGateway;

/// Writes go to the local mirror first and then to the primary store. Reads prefer the primary
/// store and use the mirror when the primary can't be reached or has no record for the date.
pub struct FallbackGateway<P, F> {
    primary: P,
    mirror: F,
}

impl<P: StatsGateway, F: StatsGateway> FallbackGateway<P, F> {
    pub fn new(primary: P, mirror: F) -> Self {
        Self { primary, mirror }
    }
}

#[async_trait]
impl<P: StatsGateway, F: StatsGateway> StatsGateway for FallbackGateway<P, F> {
    async fn upsert(&self, record: DailyRecord) -> Result<DailyRecord> {
        let mirrored = self.mirror.upsert(record.clone()).await;
        if let Err(e) = &mirrored {
            warn!("Failed to mirror stats for {} locally {e:?}", record.date);
        }
        match self.primary.upsert(record).await {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!("Remote store unavailable, keeping local copy {e:?}");
                mirrored
            }
        }
    }

    async fn open_day(&self, date: NaiveDate) -> Result<DailyRecord> {
        let mirrored = self.mirror.open_day(date).await;
        if let Err(e) = &mirrored {
            warn!("Failed to open {date} locally {e:?}");
        }
        match self.primary.open_day(date).await {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!("Remote store unavailable, keeping local copy {e:?}");
                mirrored
            }
        }
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>> {
        match self.primary.get(date).await {
            Ok(Some(v)) => Ok(Some(v)),
            // Written only locally while the primary store was down
            Ok(None) => self.mirror.get(date).await,
            Err(e) => {
                warn!("Remote store unavailable, reading {date} locally {e:?}");
                self.mirror.get(date).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<DailyRecord>> {
        match self.primary.list().await {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!("Remote store unavailable, listing locally {e:?}");
                self.mirror.list().await
            }
        }
    }
}
