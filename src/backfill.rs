// One-time backfill: re-aggregate the last N days at startup, then refresh profit windows.

use crate::rollup::{run_daily_rollup, run_profit_rollup};
use crate::stats_repo::StatsRepo;
use crate::timebucket::{DayClock, days_before};
use std::sync::Arc;
use tracing::info;

/// Re-runs the daily stage for each of the last `days` days (oldest first, today included)
/// and then the profit stage once. Idempotent. Returns the number of daily rows written.
pub async fn run_backfill(
    repo: Arc<StatsRepo>,
    clock: &DayClock,
    days: u32,
    now_ms: i64,
) -> anyhow::Result<usize> {
    let today = clock.day_of(now_ms);
    let mut written = 0;
    for back in (0..days as i64).rev() {
        written += run_daily_rollup(repo.as_ref(), clock, days_before(today, back), now_ms).await?;
    }
    run_profit_rollup(repo.as_ref(), today, now_ms).await?;
    info!(days, daily_rows = written, "backfill complete");
    Ok(written)
}
