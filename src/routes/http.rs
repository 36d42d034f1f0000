// Handlers: version, snapshot ingest, daily/hourly series, poll

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;
use crate::models::RuntimeSnapshot;
use crate::series::{node_daily_series, resolve_date_range, user_daily_series};
use crate::sync::{PollRequest, PollResponse};
use crate::timebucket::{MS_PER_DAY, MS_PER_HOUR, now_ms};
use crate::version::{NAME, VERSION};

/// Hours of history returned by the hourly series when no range is given.
const DEFAULT_HOURLY_WINDOW_HOURS: i64 = 25;

#[derive(Debug, Deserialize)]
pub(super) struct RangeParams {
    from: Option<String>,
    to: Option<String>,
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// POST /api/snapshots: store the latest snapshot of each node. Missing `recorded_at`
/// is stamped with server time.
pub(super) async fn ingest_snapshots(
    State(state): State<AppState>,
    Json(mut snapshots): Json<Vec<RuntimeSnapshot>>,
) -> Result<impl IntoResponse, ApiError> {
    let now = now_ms();
    for s in snapshots.iter_mut().filter(|s| s.recorded_at <= 0) {
        s.recorded_at = now;
    }
    state.repo.upsert_snapshots(&snapshots, now).await?;
    Ok(Json(serde_json::json!({ "accepted": snapshots.len() })))
}

/// GET /api/nodes/{node_id}/daily?from=YYYY-MM-DD&to=YYYY-MM-DD
pub(super) async fn node_daily(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let today = state.clock.day_of(now_ms());
    let (from, to) = resolve_date_range(params.from.as_deref(), params.to.as_deref(), today)?;
    let series = node_daily_series(&state.repo, &node_id, from, to).await?;
    Ok(Json(serde_json::json!({ "series_data": series })))
}

/// GET /api/users/{user_id}/daily?from=YYYY-MM-DD&to=YYYY-MM-DD
pub(super) async fn user_daily(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let today = state.clock.day_of(now_ms());
    let (from, to) = resolve_date_range(params.from.as_deref(), params.to.as_deref(), today)?;
    let series = user_daily_series(&state.repo, &user_id, from, to).await?;
    Ok(Json(serde_json::json!({ "series_data": series })))
}

/// GET /api/nodes/{node_id}/hourly?from=YYYY-MM-DD&to=YYYY-MM-DD: raw hourly rows.
/// Without a range: the last DEFAULT_HOURLY_WINDOW_HOURS hours.
pub(super) async fn node_hourly(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let now = now_ms();
    let (from_ts, to_ts) = if params.from.is_none() && params.to.is_none() {
        (now - DEFAULT_HOURLY_WINDOW_HOURS * MS_PER_HOUR, now + 1)
    } else {
        let today = state.clock.day_of(now);
        let (from, to) =
            resolve_date_range(params.from.as_deref(), params.to.as_deref(), today)?;
        (
            state.clock.day_start_ms(from),
            state.clock.day_start_ms(to) + MS_PER_DAY,
        )
    };
    let rows = state.repo.get_node_hourly(&node_id, from_ts, to_ts).await?;
    Ok(Json(serde_json::json!({ "series_data": rows })))
}

/// POST /api/nodes/profile: incremental poll with `{node_id, keys, since}`.
pub(super) async fn poll_profile(
    State(state): State<AppState>,
    Json(req): Json<PollRequest>,
) -> Result<Json<PollResponse>, ApiError> {
    if req.node_id.trim().is_empty() {
        return Err(ApiError::NodeNotFound(req.node_id));
    }
    let resp = state.poll.poll(&req, now_ms()).await?;
    Ok(Json(resp))
}
