// Shared test helpers
#![allow(dead_code)]

use nodestats::models::{HourlyRecord, RuntimeSnapshot};
use nodestats::stats_repo::StatsRepo;
use std::sync::Arc;
use tempfile::TempDir;

pub const HOUR: i64 = 3_600_000;
pub const DAY: i64 = 86_400_000;

/// 2024-03-01T00:00:00Z in unix millis.
pub const MAR_1: i64 = 1_709_251_200_000;

/// Fresh, initialized repo in a temp dir. Keep the TempDir alive for the test's duration.
pub async fn test_repo() -> (TempDir, Arc<StatsRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stats.db");
    let repo = StatsRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}

pub fn snapshot(node_id: &str, recorded_at: i64, profit: f64, online: f64) -> RuntimeSnapshot {
    RuntimeSnapshot {
        node_id: node_id.into(),
        user_id: None,
        recorded_at,
        cumulative_profit: profit,
        online_time: online,
        disk_usage: 0.5,
        pkg_loss_ratio: 0.01,
        latency: 20.0,
        nat_ratio: 1.0,
        cpu_cores: 4,
        cpu_usage: 12.5,
        memory: 8192.0,
        memory_usage: 0.4,
        disk_space: 512.0,
    }
}

pub fn hourly(node_id: &str, user_id: Option<&str>, bucket_start: i64, income: f64) -> HourlyRecord {
    HourlyRecord {
        node_id: node_id.into(),
        user_id: user_id.map(str::to_owned),
        bucket_start,
        hour_income: income,
        online_time: 0.0,
        disk_usage: 0.0,
        latency: 0.0,
        pkg_loss_ratio: 0.0,
        nat_ratio: 0.0,
    }
}

/// Writes a snapshot for `node_id` and runs one full cycle at `at`.
pub async fn report_and_cycle(
    repo: &StatsRepo,
    owners: &nodestats::owners::NodeOwners,
    node_id: &str,
    at: i64,
    profit: f64,
    online: f64,
) -> nodestats::rollup_worker::CycleReport {
    repo.upsert_snapshots(&[snapshot(node_id, at, profit, online)], at)
        .await
        .unwrap();
    nodestats::rollup_worker::run_one_cycle(
        repo,
        owners,
        &nodestats::timebucket::DayClock::default(),
        at,
    )
    .await
}
