// Poll handling: build the requested sections from the node profile and rollup tables,
// then pass them through the change detector.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChangeDetector, DigestStore, MemoryDigestStore, has_news};
use crate::error::ApiError;
use crate::models::{IncomePoint, NodeProfile};
use crate::series::hourly_income_points;
use crate::stats_repo::StatsRepo;
use crate::timebucket::{DayClock, MS_PER_DAY, days_before};

pub const SECTION_INCOME: &str = "income";
pub const SECTION_ONLINE: &str = "online";
pub const SECTION_DAY_INCOMES: &str = "day_incomes";
pub const SECTION_MONTH_INCOMES: &str = "month_incomes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollRequest {
    pub node_id: String,
    #[serde(default)]
    pub keys: Vec<String>,
    /// Unix seconds from the previous response; 0 means "no previous poll".
    #[serde(default)]
    pub since: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Section {
    Totals { today: f64, total: f64 },
    Series(Vec<IncomePoint>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    /// Server time (unix seconds); pass back as `since` on the next poll.
    pub since: i64,
    #[serde(flatten)]
    pub sections: BTreeMap<String, Section>,
}

pub struct PollService<S = MemoryDigestStore> {
    repo: Arc<StatsRepo>,
    detector: ChangeDetector<S>,
    clock: DayClock,
    month_window_days: u32,
}

impl<S: DigestStore> PollService<S> {
    pub fn new(repo: Arc<StatsRepo>, store: S, clock: DayClock, month_window_days: u32) -> Self {
        Self {
            repo,
            detector: ChangeDetector::new(store),
            clock,
            month_window_days,
        }
    }

    pub fn detector(&self) -> &ChangeDetector<S> {
        &self.detector
    }

    pub async fn poll(&self, req: &PollRequest, now_ms: i64) -> Result<PollResponse, ApiError> {
        let mut out = PollResponse {
            since: now_ms.div_euclid(1000),
            sections: BTreeMap::new(),
        };

        let profile = self
            .repo
            .get_profile(&req.node_id)
            .await?
            .ok_or_else(|| ApiError::NodeNotFound(req.node_id.clone()))?;

        let since_ms = (req.since > 0).then(|| req.since.saturating_mul(1000));
        if !has_news(since_ms, profile.updated_at) {
            debug!(node_id = %req.node_id, "poll: no updates since last poll");
            return Ok(out);
        }

        let mut response = BTreeMap::new();
        for key in &req.keys {
            if response.contains_key(key) {
                continue;
            }
            if let Some(section) = self.build_section(key, &profile, now_ms).await {
                response.insert(key.clone(), section);
            }
        }

        // No `since`: a new client gets everything; the digest still learns what was served.
        out.sections = match since_ms {
            Some(_) => self.detector.diff(&req.node_id, response),
            None => self.detector.record_all(&req.node_id, response),
        };
        Ok(out)
    }

    async fn build_section(&self, key: &str, profile: &NodeProfile, now_ms: i64) -> Option<Section> {
        match key {
            SECTION_INCOME => Some(Section::Totals {
                today: profile.today_profit,
                total: profile.cumulative_profit,
            }),
            SECTION_ONLINE => Some(Section::Totals {
                today: profile.today_online_time,
                total: profile.online_time,
            }),
            SECTION_DAY_INCOMES => self.day_incomes(&profile.node_id, now_ms).await.map(Section::Series),
            SECTION_MONTH_INCOMES => self
                .month_incomes(&profile.node_id, now_ms)
                .await
                .map(Section::Series),
            other => {
                debug!(section = other, "unknown poll section ignored");
                None
            }
        }
    }

    /// Income earned per local hour today. The previous day is read too so the first
    /// sample of today has a baseline.
    async fn day_incomes(&self, node_id: &str, now_ms: i64) -> Option<Vec<IncomePoint>> {
        let day_start = self.clock.day_start_ms(self.clock.day_of(now_ms));
        match self
            .repo
            .get_node_hourly(node_id, day_start - MS_PER_DAY, now_ms + 1)
            .await
        {
            Ok(records) => Some(hourly_income_points(&records, day_start, &self.clock)),
            Err(e) => {
                warn!(node_id, error = %e, section = SECTION_DAY_INCOMES, "section query failed");
                None
            }
        }
    }

    async fn month_incomes(&self, node_id: &str, now_ms: i64) -> Option<Vec<IncomePoint>> {
        let today = self.clock.day_of(now_ms);
        let from = days_before(today, self.month_window_days.saturating_sub(1) as i64);
        match self.repo.get_node_daily(node_id, from, today).await {
            Ok(rows) => Some(
                rows.into_iter()
                    .map(|r| IncomePoint {
                        k: r.date,
                        v: r.income,
                    })
                    .collect(),
            ),
            Err(e) => {
                warn!(node_id, error = %e, section = SECTION_MONTH_INCOMES, "section query failed");
                None
            }
        }
    }
}
