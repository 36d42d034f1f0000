// Background worker: one pipeline per cycle, stages in order hourly -> daily -> profit.
// Profit reads daily rows, so it is skipped when the daily stage failed.
// Cycles run on a cron schedule (local time) or a fixed interval; a single loop means a
// slow cycle delays the next tick instead of overlapping it.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::owners::{NodeOwners, OwnerLookup};
use crate::rollup::{run_daily_rollup, run_hourly_rollup, run_profit_rollup};
use crate::stats_repo::StatsRepo;
use crate::timebucket::{DayClock, days_before, now_ms};

/// Config for the rollup worker.
#[derive(Debug, Clone)]
pub struct RollupWorkerConfig {
    pub cycle_interval_secs: u64,
    /// Optional cron expression (e.g. "0 5 * * * *" = five past every hour). Uses local time.
    pub schedule: Option<String>,
    pub clock: DayClock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Stage finished; number of rows or profiles written.
    Done(u64),
    Failed,
    /// Not run because an upstream stage failed.
    Skipped,
}

impl StageOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, StageOutcome::Done(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub hourly: StageOutcome,
    pub daily: StageOutcome,
    pub profit: StageOutcome,
}

/// Spawns the rollup worker. Runs until `shutdown_rx` fires.
pub fn spawn(
    repo: Arc<StatsRepo>,
    owners: OwnerLookup,
    config: RollupWorkerConfig,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, owners, config, shutdown_rx).await;
    })
}

#[instrument(skip(repo, owners, shutdown_rx), fields(interval_secs = config.cycle_interval_secs))]
async fn run(
    repo: Arc<StatsRepo>,
    owners: OwnerLookup,
    config: RollupWorkerConfig,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let (tick_tx, mut tick_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(cycle_scheduler(config.clone(), tick_tx));

    loop {
        tokio::select! {
            tick = tick_rx.recv() => {
                if tick.is_none() {
                    warn!("rollup scheduler stopped");
                    break;
                }
                let snapshot = owners.borrow().clone();
                let report = run_one_cycle(&repo, &snapshot, &config.clock, now_ms()).await;
                info!(?report, "rollup cycle finished");
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("rollup worker shutting down");
                break;
            }
        }
    }
}

/// Sends on `tx` at each cycle time (cron or fixed interval). Uses `try_send`, so ticks
/// that arrive while a cycle is still running are dropped.
async fn cycle_scheduler(config: RollupWorkerConfig, tx: tokio::sync::mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid rollup schedule; rollups will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            let next = schedule.after(&now).next();
            if let Some(next) = next {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                if tx.is_closed() {
                    break;
                }
                let _ = tx.try_send(());
            } else {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    } else {
        let mut interval =
            tokio::time::interval(Duration::from_secs(config.cycle_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if tx.is_closed() {
                break;
            }
            let _ = tx.try_send(());
        }
    }
}

/// Runs one full pipeline at `now_ms`. Used by the worker loop and by tests.
///
/// The daily stage re-aggregates yesterday as well as today so the last samples written
/// before midnight are folded in even if the previous cycle missed them.
pub async fn run_one_cycle(
    repo: &StatsRepo,
    owners: &NodeOwners,
    clock: &DayClock,
    now_ms: i64,
) -> CycleReport {
    let hourly = match run_hourly_rollup(repo, owners, now_ms).await {
        Ok(n) => StageOutcome::Done(n as u64),
        Err(e) => {
            warn!(error = %e, stage = "hourly", "rollup stage failed");
            StageOutcome::Failed
        }
    };

    let today = clock.day_of(now_ms);
    let mut written = 0u64;
    let mut daily_failed = false;
    for day in [days_before(today, 1), today] {
        match run_daily_rollup(repo, clock, day, now_ms).await {
            Ok(n) => written += n as u64,
            Err(e) => {
                warn!(error = %e, stage = "daily", day = %day, "rollup stage failed");
                daily_failed = true;
            }
        }
    }
    let daily = if daily_failed {
        StageOutcome::Failed
    } else {
        StageOutcome::Done(written)
    };

    let profit = if daily.is_done() {
        match run_profit_rollup(repo, today, now_ms).await {
            Ok(n) => StageOutcome::Done(n),
            Err(e) => {
                warn!(error = %e, stage = "profit", "rollup stage failed");
                StageOutcome::Failed
            }
        }
    } else {
        warn!("profit stage skipped: daily stage failed");
        StageOutcome::Skipped
    };

    CycleReport {
        hourly,
        daily,
        profit,
    }
}
