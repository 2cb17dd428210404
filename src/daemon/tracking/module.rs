use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use tokio::{select, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    daemon::{
        events::{
            message::{Inbound, Outbound, ReplyBody},
            TrackerEvent,
        },
        persistence::PersistCommand,
    },
    gateway::StatsGateway,
    storage::entities::DailyRecord,
    utils::clock::Clock,
};

use super::tracker::{Effect, Tracker};

/// Owns the [Tracker] and feeds it one event at a time: inbound messages, due timers and the
/// final flush on shutdown.
pub struct TrackingModule<Tz: TimeZone> {
    tracker: Tracker<Tz>,
    inbound: mpsc::Receiver<Inbound>,
    persistence: mpsc::UnboundedSender<PersistCommand>,
    replies: mpsc::UnboundedSender<Outbound>,
    gateway: Arc<dyn StatsGateway>,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
}

impl<Tz: TimeZone> TrackingModule<Tz> {
    pub fn new(
        tracker: Tracker<Tz>,
        inbound: mpsc::Receiver<Inbound>,
        persistence: mpsc::UnboundedSender<PersistCommand>,
        replies: mpsc::UnboundedSender<Outbound>,
        gateway: Arc<dyn StatsGateway>,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            tracker,
            inbound,
            persistence,
            replies,
            gateway,
            shutdown,
            clock,
        }
    }

    /// Executes the tracker event loop.
    pub async fn run(mut self) -> Result<()> {
        self.restore().await;

        loop {
            let deadline = self.tracker.next_deadline();
            select! {
                _ = self.shutdown.cancelled() => break,
                inbound = self.inbound.recv() => match inbound {
                    Some(inbound) => self.on_inbound(inbound),
                    None => break,
                },
                _ = wait_for(self.clock.as_ref(), deadline) => self.on_timers(),
            }
        }

        info!("Flushing stats before exit");
        let effects = self.tracker.finalize(self.clock.time());
        self.apply(effects, None);
        // Input may end before a signal arrives, the other modules wait on this token.
        self.shutdown.cancel();
        Ok(())
    }

    async fn restore(&mut self) {
        let today = self.tracker.record().date;
        let stored = match load_latest(self.gateway.as_ref(), today).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to load stats of {today}, starting empty: {e:?}");
                None
            }
        };
        let effects = self.tracker.restore(stored, self.clock.time());
        self.apply(effects, None);
    }

    fn on_inbound(&mut self, inbound: Inbound) {
        let Inbound { request_id, event } = inbound;
        let is_query = matches!(event, TrackerEvent::Query(_));

        let effects = self.tracker.handle(event, self.clock.time());
        self.apply(effects, request_id.clone());

        if let Some(request_id) = request_id.filter(|_| !is_query) {
            self.reply(Outbound::ack(request_id));
        }
    }

    fn on_timers(&mut self) {
        let now = self.clock.time();
        for kind in self.tracker.due_timers(now) {
            debug!("Timer {kind:?} fired");
            let effects = self.tracker.handle(TrackerEvent::Tick(kind), now);
            self.apply(effects, None);
        }
    }

    fn apply(&self, effects: Vec<Effect>, request_id: Option<Value>) {
        for effect in effects {
            match effect {
                Effect::Persist(record) => self.persist(PersistCommand::Upsert(record)),
                Effect::OpenDay(date) => self.persist(PersistCommand::OpenDay(date)),
                Effect::Reply(reply) => self.reply(Outbound {
                    request_id: request_id.clone(),
                    body: reply.into(),
                }),
                Effect::FetchHistory(date) => self.fetch_history(date, request_id.clone()),
            }
        }
    }

    fn persist(&self, command: PersistCommand) {
        if self.persistence.send(command).is_err() {
            error!("Persistence module stopped, stats are kept in memory only");
        }
    }

    fn reply(&self, reply: Outbound) {
        if self.replies.send(reply).is_err() {
            warn!("Reply writer stopped, dropping reply");
        }
    }

    fn fetch_history(&self, date: NaiveDate, request_id: Option<Value>) {
        let gateway = self.gateway.clone();
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let record = gateway.get(date).await.unwrap_or_else(|e| {
                warn!("Failed to fetch stats of {date}: {e:?}");
                None
            });
            let reply = Outbound {
                request_id,
                body: ReplyBody::HistoryStats(record),
            };
            if replies.send(reply).is_err() {
                warn!("Reply writer stopped, dropping history of {date}");
            }
        });
    }
}

/// Today's record, or the newest earlier one when today has none yet, so a day left open by a
/// previous run gets closed.
async fn load_latest(
    gateway: &dyn StatsGateway,
    today: NaiveDate,
) -> Result<Option<DailyRecord>> {
    if let Some(record) = gateway.get(today).await? {
        return Ok(Some(record));
    }
    let latest = gateway
        .list()
        .await?
        .into_iter()
        .find(|v| v.date < today);
    Ok(latest)
}

async fn wait_for(clock: &dyn Clock, deadline: Option<DateTime<Utc>>) {
    match deadline {
        Some(deadline) => clock.sleep_until_time(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use chrono::NaiveDate;
    use mockall::predicate::eq;

    use crate::{gateway::MockStatsGateway, storage::entities::DailyRecord};

    use super::load_latest;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 7, day).unwrap()
    }

    #[tokio::test]
    async fn test_load_latest_prefers_today() -> Result<()> {
        let mut gateway = MockStatsGateway::new();
        gateway
            .expect_get()
            .with(eq(date(4)))
            .returning(|d| Ok(Some(DailyRecord::empty(d))));
        gateway.expect_list().never();

        assert_eq!(
            load_latest(&gateway, date(4)).await?,
            Some(DailyRecord::empty(date(4)))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_load_latest_finds_stale_day() -> Result<()> {
        let mut gateway = MockStatsGateway::new();
        gateway.expect_get().returning(|_| Ok(None));
        gateway.expect_list().times(1).returning(|| {
            Ok(vec![
                DailyRecord::empty(date(9)),
                DailyRecord::empty(date(2)),
                DailyRecord::empty(date(1)),
            ])
        });

        assert_eq!(
            load_latest(&gateway, date(4)).await?,
            Some(DailyRecord::empty(date(2)))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_load_latest_empty_store() -> Result<()> {
        let mut gateway = MockStatsGateway::new();
        gateway.expect_get().returning(|_| Ok(None));
        gateway.expect_list().returning(|| Ok(vec![]));
        assert_eq!(load_latest(&gateway, date(4)).await?, None);

        let mut gateway = MockStatsGateway::new();
        gateway.expect_get().returning(|_| Err(anyhow!("offline")));
        assert!(load_latest(&gateway, date(4)).await.is_err());
        Ok(())
    }
}
