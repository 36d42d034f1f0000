// HTTP routes: snapshot ingest, time series, incremental poll

mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::stats_repo::StatsRepo;
use crate::sync::PollService;
use crate::timebucket::DayClock;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) repo: Arc<StatsRepo>,
    pub(crate) poll: Arc<PollService>,
    pub(crate) clock: DayClock,
}

pub fn app(repo: Arc<StatsRepo>, poll: Arc<PollService>, clock: DayClock) -> Router {
    let state = AppState { repo, poll, clock };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/snapshots", post(http::ingest_snapshots)) // POST /api/snapshots
        .route("/api/nodes/profile", post(http::poll_profile)) // POST /api/nodes/profile
        .route("/api/nodes/{node_id}/daily", get(http::node_daily)) // GET /api/nodes/{id}/daily
        .route("/api/nodes/{node_id}/hourly", get(http::node_hourly)) // GET /api/nodes/{id}/hourly
        .route("/api/users/{user_id}/daily", get(http::user_daily)) // GET /api/users/{id}/daily
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
