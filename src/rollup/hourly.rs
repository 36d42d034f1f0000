// Snapshot -> hourly record. Each run is its own bucket instant (`now`), not a wall-clock hour.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::models::{HourlyRecord, RuntimeSnapshot};
use crate::owners::NodeOwners;
use crate::stats_repo::StatsRepo;

/// One hourly record per snapshot. Counters are copied as running totals; user_id comes
/// from the owner lookup only and stays empty when the node is unmapped.
pub fn build_hourly_records(
    snapshots: &[RuntimeSnapshot],
    bucket_start: i64,
    owners: &NodeOwners,
) -> Vec<HourlyRecord> {
    snapshots
        .iter()
        .map(|s| HourlyRecord {
            node_id: s.node_id.clone(),
            user_id: owners.user_of(&s.node_id).map(str::to_owned),
            bucket_start,
            hour_income: s.cumulative_profit,
            online_time: s.online_time,
            disk_usage: s.disk_usage,
            latency: s.latency,
            pkg_loss_ratio: s.pkg_loss_ratio,
            nat_ratio: s.nat_ratio,
        })
        .collect()
}

/// Reads every node's latest snapshot and upserts one hourly row per node at `now_ms`.
/// Returns the number of rows written.
pub async fn run_hourly_rollup(
    repo: &StatsRepo,
    owners: &NodeOwners,
    now_ms: i64,
) -> anyhow::Result<usize> {
    let started = Instant::now();
    debug!(bucket_start = now_ms, "hourly rollup started");
    let snapshots = repo.get_runtime_snapshots().await?;
    let records = build_hourly_records(&snapshots, now_ms, owners);

    let unowned = records.iter().filter(|r| r.user_id.is_none()).count();
    if owners.is_empty() && !records.is_empty() {
        warn!("hourly rollup: owner table is empty; rows carry no user_id");
    } else if unowned > 0 {
        debug!(unowned, "hourly rollup: nodes without owner mapping");
    }

    repo.bulk_upsert_hourly(&records).await?;
    info!(
        nodes = records.len(),
        bucket_start = now_ms,
        cost_ms = started.elapsed().as_millis() as u64,
        "hourly rollup done"
    );
    Ok(records.len())
}
