// Presentation-edge series: daily rows are sparse, charts want one entry per day.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::error::ApiError;
use crate::models::{DailyStatistic, HourlyRecord, IncomePoint};
use crate::stats_repo::StatsRepo;
use crate::timebucket::{DayClock, checked_days_before, format_date, parse_date};

/// Days shown when the caller gives no `from`.
pub const DEFAULT_RANGE_DAYS: i64 = 14;
pub const MAX_RANGE_DAYS: i64 = 366;

/// One entry per day in `[from, to]`, ascending. Days missing from `stats` become
/// placeholders with zero income and no ratios.
pub fn fill_daily_gaps(
    from: NaiveDate,
    to: NaiveDate,
    stats: Vec<DailyStatistic>,
) -> Vec<DailyStatistic> {
    let mut by_date: HashMap<String, DailyStatistic> =
        stats.into_iter().map(|s| (s.date.clone(), s)).collect();
    from.iter_days()
        .take_while(|d| *d <= to)
        .map(|d| {
            let key = format_date(d);
            by_date
                .remove(&key)
                .unwrap_or_else(|| DailyStatistic::placeholder(key))
        })
        .collect()
}

/// Resolves optional `YYYY-MM-DD` bounds. Defaults: the last DEFAULT_RANGE_DAYS days
/// through `today`.
pub fn resolve_date_range(
    from: Option<&str>,
    to: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let parse = |s: &str| parse_date(s).map_err(|_| ApiError::InvalidDate(s.to_string()));
    let to = match to {
        Some(s) if !s.trim().is_empty() => parse(s)?,
        _ => today,
    };
    let from = match from {
        Some(s) if !s.trim().is_empty() => parse(s)?,
        _ => checked_days_before(to, DEFAULT_RANGE_DAYS - 1).ok_or_else(|| {
            ApiError::InvalidRange(format!(
                "no {} day range ends on {}",
                DEFAULT_RANGE_DAYS,
                format_date(to)
            ))
        })?,
    };
    if from > to {
        return Err(ApiError::InvalidRange(format!(
            "from {} is after to {}",
            format_date(from),
            format_date(to)
        )));
    }
    let span = (to - from).num_days() + 1;
    if span > MAX_RANGE_DAYS {
        return Err(ApiError::InvalidRange(format!(
            "{} days requested, at most {} allowed",
            span, MAX_RANGE_DAYS
        )));
    }
    Ok((from, to))
}

/// Gap-filled daily series of one node.
pub async fn node_daily_series(
    repo: &StatsRepo,
    node_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<DailyStatistic>> {
    let rows = repo.get_node_daily(node_id, from, to).await?;
    let stats = rows.iter().map(DailyStatistic::from).collect();
    Ok(fill_daily_gaps(from, to, stats))
}

/// Gap-filled daily series summed over all nodes of one user.
pub async fn user_daily_series(
    repo: &StatsRepo,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<DailyStatistic>> {
    let stats = repo.get_user_daily(user_id, from, to).await?;
    Ok(fill_daily_gaps(from, to, stats))
}

/// Income per local hour from `day_start_ms` on. `records` must be one node's rows in
/// ascending bucket order; a row before `day_start_ms` only serves as the baseline.
/// Counter drops are clamped to zero.
pub fn hourly_income_points(
    records: &[HourlyRecord],
    day_start_ms: i64,
    clock: &DayClock,
) -> Vec<IncomePoint> {
    let mut by_hour: BTreeMap<String, f64> = BTreeMap::new();
    let mut prev: Option<f64> = None;
    for r in records {
        if r.bucket_start >= day_start_ms
            && let Some(p) = prev
        {
            *by_hour.entry(clock.hour_label(r.bucket_start)).or_default() +=
                (r.hour_income - p).max(0.0);
        }
        prev = Some(r.hour_income);
    }
    by_hour
        .into_iter()
        .map(|(k, v)| IncomePoint { k, v })
        .collect()
}
