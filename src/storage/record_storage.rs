use std::{
    future::{self, Future},
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use fs4::tokio::AsyncFileExt;
use futures::{stream, StreamExt};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
    sync::Mutex,
};
use tracing::{debug, error, warn};

use crate::utils::time::date_to_record_name;

use super::entities::{DailyRecord, StatsPayload, StoredStats};

/// Amount of record files read at the same time while listing.
const LIST_CONCURRENCY: usize = 4;

/// Interface for abstracting storage of daily records.
pub trait RecordStorage {
    /// Replaces the record for its date. With `is_new_day` set only creates an empty record when
    /// none exists yet.
    fn upsert(
        &self,
        payload: StatsPayload,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<StoredStats>> + Send;

    fn get(&self, date: NaiveDate) -> impl Future<Output = Result<Option<StoredStats>>> + Send;

    /// All records, newest date first.
    fn list(&self) -> impl Future<Output = Result<Vec<StoredStats>>> + Send;
}

impl<T: Deref + Sync> RecordStorage for T
where
    T::Target: RecordStorage + Sync,
{
    fn upsert(
        &self,
        payload: StatsPayload,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<StoredStats>> + Send {
        self.deref().upsert(payload, now)
    }

    fn get(&self, date: NaiveDate) -> impl Future<Output = Result<Option<StoredStats>>> + Send {
        self.deref().get(date)
    }

    fn list(&self) -> impl Future<Output = Result<Vec<StoredStats>>> + Send {
        self.deref().list()
    }
}

/// The main realization of [RecordStorage]. Every date lives in its own
/// `<prefix><YYYY-MM-DD>.json` file.
pub struct RecordStorageImpl {
    record_dir: PathBuf,
    prefix: String,
    // File locks guard against other processes, this one against our own tasks.
    write_lock: Mutex<()>,
}

impl RecordStorageImpl {
    pub fn new(record_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&record_dir)?;

        Ok(Self {
            record_dir,
            prefix: String::new(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn with_prefix(self, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..self
        }
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.record_dir
            .join(format!("{}{}.json", self.prefix, date_to_record_name(date)))
    }

    fn date_from_file_name(&self, name: &str) -> Option<NaiveDate> {
        let date = name.strip_prefix(&self.prefix)?.strip_suffix(".json")?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }

    async fn upsert_with_file(
        file: &mut File,
        path: &Path,
        StatsPayload { record, is_new_day }: StatsPayload,
        now: DateTime<Utc>,
    ) -> Result<StoredStats> {
        let mut content = String::new();
        file.read_to_string(&mut content).await?;

        let stored = match parse_entity(path, &content) {
            Some(existing) if is_new_day => return Ok(existing),
            Some(existing) => StoredStats {
                record: record.normalized(),
                created_at: existing.created_at,
                updated_at: now,
            },
            None => StoredStats {
                record: if is_new_day {
                    DailyRecord::empty(record.date)
                } else {
                    record.normalized()
                },
                created_at: now,
                updated_at: now,
            },
        };

        let buffer = serde_json::to_vec_pretty(&stored)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(stored)
    }
}

impl RecordStorage for RecordStorageImpl {
    async fn upsert(&self, payload: StatsPayload, now: DateTime<Utc>) -> Result<StoredStats> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(payload.record.date);

        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&path)
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::upsert_with_file(&mut file, &path, payload, now).await;
        file.unlock_async().await?;
        result
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<StoredStats>> {
        read_entity(&self.path_for(date)).await
    }

    async fn list(&self) -> Result<Vec<StoredStats>> {
        let mut entries = tokio::fs::read_dir(&self.record_dir).await?;
        let mut files = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(date) = name.to_str().and_then(|v| self.date_from_file_name(v)) {
                files.push((date, entry.path()));
            }
        }
        files.sort_by(|a, b| b.0.cmp(&a.0));

        let records = stream::iter(files)
            .map(|(date, path)| async move { (date, read_entity(&path).await) })
            .buffered(LIST_CONCURRENCY)
            .filter_map(|(date, result)| {
                future::ready(match result {
                    Ok(v) => v,
                    Err(e) => {
                        error!("Failed to read record for {date} {e:?}");
                        None
                    }
                })
            })
            .collect::<Vec<_>>()
            .await;

        Ok(records)
    }
}

async fn read_entity(path: &Path) -> Result<Option<StoredStats>> {
    debug!("Reading {path:?}");
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => Err(e)?,
    };

    file.lock_shared()?;
    let mut content = String::new();
    let read = file.read_to_string(&mut content).await;
    file.unlock_async().await?;
    read?;

    Ok(parse_entity(path, &content))
}

fn parse_entity(path: &Path, content: &str) -> Option<StoredStats> {
    if content.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<StoredStats>(content) {
        Ok(v) => Some(v),
        Err(e) => {
            // Might happen when a write was cut off by a shutdown
            warn!("Record {path:?} is corrupted, treating it as missing: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::storage::entities::{
        DailyRecord, Difficulty, SolvedProblem, StatsPayload, StoredStats,
    };

    use super::{RecordStorage, RecordStorageImpl};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 7, day).unwrap()
    }

    fn problem(id: &str) -> SolvedProblem {
        SolvedProblem {
            id: id.into(),
            title: id.into(),
            difficulty: Difficulty::Easy,
            language: "rust".into(),
            time_spent: 1000,
            timestamp: 1_530_700_000_000,
            url: None,
        }
    }

    fn payload(record: DailyRecord) -> StatsPayload {
        StatsPayload {
            record,
            is_new_day: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_arrays() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().to_owned())?;
        let now = Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap();

        let mut first = DailyRecord::empty(date(4));
        first.push_solved(problem("two-sum"));
        first.push_solved(problem("add-two-numbers"));
        storage.upsert(payload(first), now).await?;

        let mut second = DailyRecord::empty(date(4));
        second.push_solved(problem("valid-parentheses"));
        second.total_time_spent = 42;
        let stored = storage
            .upsert(payload(second.clone()), now + TimeDelta::minutes(1))
            .await?;

        assert_eq!(stored.record, second);
        assert_eq!(stored.created_at, now);
        assert_eq!(stored.updated_at, now + TimeDelta::minutes(1));

        let fetched = storage.get(date(4)).await?.unwrap();
        assert_eq!(fetched.record.problems_solved, vec![problem("valid-parentheses")]);
        assert_eq!(fetched.record.problems_solved_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_missing() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().to_owned())?;
        assert_eq!(storage.get(date(1)).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_new_day_keeps_existing() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().to_owned())?;
        let now = Utc::now();

        let mut record = DailyRecord::empty(date(5));
        record.total_time_spent = 10_000;
        storage.upsert(payload(record.clone()), now).await?;

        let stored = storage
            .upsert(
                StatsPayload {
                    record: DailyRecord::empty(date(5)),
                    is_new_day: true,
                },
                now,
            )
            .await?;
        assert_eq!(stored.record, record);

        let fresh = storage
            .upsert(
                StatsPayload {
                    record: record.clone().normalized(),
                    is_new_day: true,
                },
                now,
            )
            .await?;
        assert_eq!(fresh.record.total_time_spent, 10_000);

        let created = storage
            .upsert(
                StatsPayload {
                    record: DailyRecord {
                        date: date(6),
                        ..record
                    },
                    is_new_day: true,
                },
                now,
            )
            .await?;
        assert_eq!(created.record, DailyRecord::empty(date(6)));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_sorted_descending() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().to_owned())?.with_prefix("leetcode_stats_");
        let now = Utc::now();
        for day in [3, 9, 1, 4] {
            storage.upsert(payload(DailyRecord::empty(date(day))), now).await?;
        }
        std::fs::write(dir.path().join("notes.txt"), "not a record")?;
        std::fs::write(dir.path().join("leetcode_stats_2018-07-02.json"), "{ broken")?;

        let dates = storage
            .list()
            .await?
            .into_iter()
            .map(|v: StoredStats| v.record.date)
            .collect::<Vec<_>>();
        assert_eq!(dates, vec![date(9), date(4), date(3), date(1)]);

        assert!(dir.path().join("leetcode_stats_2018-07-09.json").exists());
        Ok(())
    }
}
