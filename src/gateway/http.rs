use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::{
    storage::entities::{DailyRecord, StatsPayload},
    utils::time::date_to_record_name,
};

use super::StatsGateway;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the REST store. `base_url` points at the api root, e.g.
/// `http://localhost:3000/api`.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn stats_url(&self) -> String {
        format!("{}/stats", self.base_url)
    }

    async fn post(&self, payload: &StatsPayload) -> Result<DailyRecord> {
        debug!("Posting stats for {}", payload.record.date);
        let record = self
            .client
            .post(self.stats_url())
            .json(payload)
            .send()
            .await?
            .error_for_status()?
            .json::<DailyRecord>()
            .await?;
        Ok(record)
    }
}

#[async_trait]
impl StatsGateway for HttpGateway {
    async fn upsert(&self, record: DailyRecord) -> Result<DailyRecord> {
        self.post(&StatsPayload {
            record,
            is_new_day: false,
        })
        .await
    }

    async fn open_day(&self, date: NaiveDate) -> Result<DailyRecord> {
        self.post(&StatsPayload {
            record: DailyRecord::empty(date),
            is_new_day: true,
        })
        .await
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>> {
        let url = format!("{}/{}", self.stats_url(), date_to_record_name(date));
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record = response.error_for_status()?.json::<DailyRecord>().await?;
        Ok(Some(record))
    }

    async fn list(&self) -> Result<Vec<DailyRecord>> {
        let records = self
            .client
            .get(self.stats_url())
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<DailyRecord>>()
            .await?;
        Ok(records)
    }
}
