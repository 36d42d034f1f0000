// Node profile (latest snapshot + profit windows) and the partial updates the rollup writes.

use serde::{Deserialize, Serialize};

/// Profile row served to dashboards and pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProfile {
    pub node_id: String,
    pub user_id: Option<String>,
    pub cumulative_profit: f64,
    pub online_time: f64,
    pub disk_usage: f64,
    pub latency: f64,
    pub pkg_loss_ratio: f64,
    pub nat_ratio: f64,
    pub cpu_cores: u32,
    pub cpu_usage: f64,
    pub memory: f64,
    pub memory_usage: f64,
    pub disk_space: f64,
    pub today_profit: f64,
    pub yesterday_profit: f64,
    pub seven_days_profit: f64,
    pub month_profit: f64,
    pub today_online_time: f64,
    /// Node-reported time of the stored snapshot (unix millis).
    pub recorded_at: i64,
    /// Server time (unix millis) of the last snapshot ingest or profit change.
    pub updated_at: i64,
}

/// Rolling totals for one node from one profit cycle. `None` means the window had no
/// daily rows for the node and the stored value must be left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfitWindowSet {
    pub today: Option<f64>,
    pub yesterday: Option<f64>,
    pub seven_days: Option<f64>,
    pub month: Option<f64>,
    pub today_online_time: Option<f64>,
}

impl ProfitWindowSet {
    pub fn is_empty(&self) -> bool {
        self.today.is_none()
            && self.yesterday.is_none()
            && self.seven_days.is_none()
            && self.month.is_none()
            && self.today_online_time.is_none()
    }
}

/// One row of the profile bulk update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDelta {
    pub node_id: String,
    pub windows: ProfitWindowSet,
}

/// Per-node sum of daily rows over a date range.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSum {
    pub node_id: String,
    pub income: f64,
    pub online_time: f64,
}
