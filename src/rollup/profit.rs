// Daily -> rolling profit windows written back onto node profiles.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::models::{ProfileDelta, ProfitWindowSet, WindowSum};
use crate::stats_repo::StatsRepo;
use crate::timebucket::days_before;

/// Inclusive date ranges of the four windows, all ending on (or at) `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitWindows {
    pub today: (NaiveDate, NaiveDate),
    pub yesterday: (NaiveDate, NaiveDate),
    pub seven_days: (NaiveDate, NaiveDate),
    pub month: (NaiveDate, NaiveDate),
}

impl ProfitWindows {
    pub fn ending(today: NaiveDate) -> Self {
        let yesterday = days_before(today, 1);
        Self {
            today: (today, today),
            yesterday: (yesterday, yesterday),
            seven_days: (days_before(today, 6), today),
            month: (days_before(today, 29), today),
        }
    }
}

/// Range-sum results per window. A node missing from a window gets no update for it.
#[derive(Debug, Clone, Default)]
pub struct WindowSums {
    pub today: Vec<WindowSum>,
    pub yesterday: Vec<WindowSum>,
    pub seven_days: Vec<WindowSum>,
    pub month: Vec<WindowSum>,
}

/// Merges the per-window sums into one delta per node, sorted by node_id.
pub fn merge_window_sums(sums: WindowSums) -> Vec<ProfileDelta> {
    let mut by_node: BTreeMap<String, ProfitWindowSet> = BTreeMap::new();

    for s in sums.yesterday {
        by_node.entry(s.node_id).or_default().yesterday = Some(s.income);
    }
    for s in sums.seven_days {
        by_node.entry(s.node_id).or_default().seven_days = Some(s.income);
    }
    for s in sums.month {
        by_node.entry(s.node_id).or_default().month = Some(s.income);
    }
    for s in sums.today {
        let w = by_node.entry(s.node_id).or_default();
        w.today = Some(s.income);
        w.today_online_time = Some(s.online_time);
    }

    by_node
        .into_iter()
        .filter(|(_, windows)| !windows.is_empty())
        .map(|(node_id, windows)| ProfileDelta { node_id, windows })
        .collect()
}

/// Window query that degrades to "no data" on a storage error, so the other windows still
/// get written and this window keeps its previous value.
async fn sum_or_empty(
    repo: &StatsRepo,
    window: &'static str,
    (from, to): (NaiveDate, NaiveDate),
) -> Vec<WindowSum> {
    match repo.sum_daily_by_node(from, to).await {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, window, "profit window query failed; window left unchanged");
            Vec::new()
        }
    }
}

/// Computes the four windows ending on `today` and writes them in one bulk update.
/// Returns the number of profiles whose windows changed.
pub async fn run_profit_rollup(
    repo: &StatsRepo,
    today: NaiveDate,
    now_ms: i64,
) -> anyhow::Result<u64> {
    let started = Instant::now();
    debug!(today = %today, "profit rollup started");
    let windows = ProfitWindows::ending(today);

    let sums = WindowSums {
        yesterday: sum_or_empty(repo, "yesterday", windows.yesterday).await,
        seven_days: sum_or_empty(repo, "seven_days", windows.seven_days).await,
        month: sum_or_empty(repo, "month", windows.month).await,
        today: sum_or_empty(repo, "today", windows.today).await,
    };
    let deltas = merge_window_sums(sums);

    let updated = repo.bulk_update_profiles(&deltas, now_ms).await?;
    info!(
        nodes = deltas.len(),
        profiles_updated = updated,
        cost_ms = started.elapsed().as_millis() as u64,
        "profit rollup done"
    );
    Ok(updated)
}
