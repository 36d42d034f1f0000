// Latest runtime snapshot per node, as reported by telemetry collection.

use serde::{Deserialize, Serialize};

use super::lenient_f64;

/// One node's measurement at ingestion time. Income and online time are cumulative
/// counters; the ratio fields are point samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    pub node_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Unix millis when the snapshot was taken.
    #[serde(default)]
    pub recorded_at: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cumulative_profit: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub online_time: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub disk_usage: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pkg_loss_ratio: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latency: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub nat_ratio: f64,
    #[serde(default)]
    pub cpu_cores: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpu_usage: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub memory: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub memory_usage: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub disk_space: f64,
}
