use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::storage::{
    entities::{StatsPayload, StoredStats},
    record_storage::RecordStorage,
};

use super::{error::ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

/// `POST /api/stats`
pub async fn save_stats(
    State(state): State<AppState>,
    Json(payload): Json<StatsPayload>,
) -> Result<Json<StoredStats>, ApiError> {
    debug!(
        "Saving stats of {} (new day: {})",
        payload.record.date, payload.is_new_day
    );
    let stored = state
        .storage
        .upsert(payload, Utc::now())
        .await
        .map_err(ApiError::Save)?;
    Ok(Json(stored))
}

/// `GET /api/stats/:date`
pub async fn get_stats(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<StoredStats>, ApiError> {
    // No record can exist under a date that doesn't parse
    let Ok(parsed) = NaiveDate::parse_from_str(&date, "%Y-%m-%d") else {
        debug!("Unparsable date {date:?}");
        return Err(ApiError::NotFound);
    };
    state
        .storage
        .get(parsed)
        .await
        .map_err(ApiError::Fetch)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `GET /api/stats`, newest date first.
pub async fn list_stats(State(state): State<AppState>) -> Result<Json<Vec<StoredStats>>, ApiError> {
    let records = state.storage.list().await.map_err(ApiError::Fetch)?;
    Ok(Json(records))
}
