// Presentation-side series types.

use serde::{Deserialize, Serialize};

use super::DailyRecord;

/// One day of a node or user time series. Gap days carry zero income and no ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatistic {
    pub date: String,
    pub income: f64,
    pub online_time: f64,
    pub disk_usage: Option<f64>,
    pub latency: Option<f64>,
    pub pkg_loss_ratio: Option<f64>,
    pub nat_ratio: Option<f64>,
}

impl DailyStatistic {
    pub fn placeholder(date: String) -> Self {
        Self {
            date,
            income: 0.0,
            online_time: 0.0,
            disk_usage: None,
            latency: None,
            pkg_loss_ratio: None,
            nat_ratio: None,
        }
    }
}

impl From<&DailyRecord> for DailyStatistic {
    fn from(r: &DailyRecord) -> Self {
        Self {
            date: r.date.clone(),
            income: r.income,
            online_time: r.online_time,
            disk_usage: Some(r.disk_usage),
            latency: Some(r.latency),
            pkg_loss_ratio: Some(r.pkg_loss_ratio),
            nat_ratio: Some(r.nat_ratio),
        }
    }
}

/// Compact chart point used by poll sections (`k` = label, `v` = value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomePoint {
    pub k: String,
    pub v: f64,
}
