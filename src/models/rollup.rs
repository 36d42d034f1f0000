// Rollup rows: one hourly record per (node, bucket), one daily record per (node, day).

use serde::{Deserialize, Serialize};

/// Hourly sample for one node. `hour_income` and `online_time` are the node's running
/// totals at `bucket_start`, not deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    pub node_id: String,
    pub user_id: Option<String>,
    /// Unix millis of the rollup run that produced this row.
    pub bucket_start: i64,
    pub hour_income: f64,
    pub online_time: f64,
    pub disk_usage: f64,
    pub latency: f64,
    pub pkg_loss_ratio: f64,
    pub nat_ratio: f64,
}

/// Daily summary for one node. `income` and `online_time` are deltas over the day;
/// ratios are means of the day's hourly samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub node_id: String,
    pub user_id: Option<String>,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub income: f64,
    pub online_time: f64,
    pub disk_usage: f64,
    pub latency: f64,
    pub pkg_loss_ratio: f64,
    pub nat_ratio: f64,
}
