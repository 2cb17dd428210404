use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use tracing::{debug, warn};

use crate::{gateway::StatsGateway, storage::entities::DailyRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistCommand {
    Upsert(DailyRecord),
    OpenDay(NaiveDate),
}

impl PersistCommand {
    fn supersedes(&self, older: &PersistCommand) -> bool {
        matches!(
            (older, self),
            (PersistCommand::Upsert(older), PersistCommand::Upsert(newer)) if older.date == newer.date
        )
    }
}

/// Receives snapshots from the tracker and writes them through the gateway. Runs until every
/// sender is dropped, so whatever was queued before shutdown is still written.
pub struct PersistenceModule {
    receiver: UnboundedReceiver<PersistCommand>,
    gateway: Arc<dyn StatsGateway>,
}

impl PersistenceModule {
    pub fn new(receiver: UnboundedReceiver<PersistCommand>, gateway: Arc<dyn StatsGateway>) -> Self {
        Self { receiver, gateway }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut pending = self.receiver.recv().await;
        while let Some(mut command) = pending.take() {
            // Queued snapshots of the same day carry the full record, only the newest matters.
            loop {
                match self.receiver.try_recv() {
                    Ok(next) if next.supersedes(&command) => command = next,
                    Ok(next) => {
                        pending = Some(next);
                        break;
                    }
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }

            self.execute(command).await;

            if pending.is_none() {
                pending = self.receiver.recv().await;
            }
        }
        Ok(())
    }

    async fn execute(&self, command: PersistCommand) {
        match command {
            PersistCommand::Upsert(record) => {
                let date = record.date;
                match self.gateway.upsert(record).await {
                    Ok(_) => debug!("Saved stats of {date}"),
                    Err(e) => warn!("Failed to save stats of {date}: {e:?}"),
                }
            }
            PersistCommand::OpenDay(date) => match self.gateway.open_day(date).await {
                Ok(_) => debug!("Opened {date}"),
                Err(e) => warn!("Failed to open {date}: {e:?}"),
            },
        }
    }
}
