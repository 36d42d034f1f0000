// Hourly -> daily. Counters (income, online time) are cumulative, so the day's value is
// max - min over the day's samples; ratios are point samples and get averaged.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::{counter_delta, mean_f64};
use crate::models::{DailyRecord, HourlyRecord};
use crate::stats_repo::StatsRepo;
use crate::timebucket::{DayClock, format_date};

/// Groups hourly records by (node, calendar day) and folds each group into a DailyRecord.
/// Output is sorted by node then date; groups are never empty, so nodes without samples
/// on a day get no record.
pub fn aggregate_daily(hourly: &[HourlyRecord], clock: &DayClock) -> Vec<DailyRecord> {
    let mut groups: BTreeMap<(&str, NaiveDate), Vec<&HourlyRecord>> = BTreeMap::new();
    for h in hourly {
        groups
            .entry((h.node_id.as_str(), clock.day_of(h.bucket_start)))
            .or_default()
            .push(h);
    }

    groups
        .into_iter()
        .map(|((node_id, day), refs)| aggregate_one_day(node_id, day, &refs))
        .collect()
}

fn aggregate_one_day(node_id: &str, day: NaiveDate, refs: &[&HourlyRecord]) -> DailyRecord {
    let collect = |f: fn(&HourlyRecord) -> f64| refs.iter().map(|h| f(h)).collect::<Vec<_>>();

    // Latest sample with a known owner wins.
    let user_id = refs
        .iter()
        .filter(|h| h.user_id.is_some())
        .max_by_key(|h| h.bucket_start)
        .and_then(|h| h.user_id.clone());

    DailyRecord {
        node_id: node_id.to_owned(),
        user_id,
        date: format_date(day),
        income: counter_delta(&collect(|h| h.hour_income)),
        online_time: counter_delta(&collect(|h| h.online_time)),
        disk_usage: mean_f64(&collect(|h| h.disk_usage)),
        latency: mean_f64(&collect(|h| h.latency)),
        pkg_loss_ratio: mean_f64(&collect(|h| h.pkg_loss_ratio)),
        nat_ratio: mean_f64(&collect(|h| h.nat_ratio)),
    }
}

/// Aggregates `day` from the stored hourly rows and upserts the result.
/// Safe to re-run: rows are keyed on (node, day). Returns the number of daily rows written.
pub async fn run_daily_rollup(
    repo: &StatsRepo,
    clock: &DayClock,
    day: NaiveDate,
    now_ms: i64,
) -> anyhow::Result<usize> {
    let started = Instant::now();
    debug!(day = %format_date(day), "daily rollup started");
    let (from, to) = clock.day_bounds(day);
    let hourly = repo.get_hourly_by_time_range(from, to).await?;
    let daily = aggregate_daily(&hourly, clock);

    repo.bulk_upsert_daily(&daily, now_ms).await?;
    info!(
        day = %format_date(day),
        hourly_rows = hourly.len(),
        nodes = daily.len(),
        cost_ms = started.elapsed().as_millis() as u64,
        "daily rollup done"
    );
    Ok(daily.len())
}
