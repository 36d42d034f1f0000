use std::str::FromStr;

use serde::Deserialize;

use crate::series::MAX_RANGE_DAYS;
use crate::timebucket::DayClock;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rollup: RollupConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollupConfig {
    pub cycle_interval_secs: u64,
    /// Optional cron expression for rollup cycles (local time). Overrides cycle_interval_secs.
    #[serde(default)]
    pub schedule: Option<String>,
    /// Offset used for calendar-day boundaries, in minutes east of UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Days to re-aggregate at startup; 0 disables the backfill.
    #[serde(default)]
    pub backfill_days: u32,
    #[serde(default = "default_owner_refresh_secs")]
    pub owner_refresh_secs: u64,
}

fn default_owner_refresh_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Days covered by the `month_incomes` poll section.
    #[serde(default = "default_month_window_days")]
    pub month_window_days: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            month_window_days: default_month_window_days(),
        }
    }
}

fn default_month_window_days() -> u32 {
    30
}

/// Largest accepted |utc_offset_minutes| (UTC-14:00 .. UTC+14:00).
const MAX_UTC_OFFSET_MINUTES: u32 = 14 * 60;

impl RollupConfig {
    pub fn day_clock(&self) -> anyhow::Result<DayClock> {
        DayClock::from_offset_minutes(self.utc_offset_minutes)
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.rollup.cycle_interval_secs > 0,
            "rollup.cycle_interval_secs must be > 0, got {}",
            self.rollup.cycle_interval_secs
        );
        anyhow::ensure!(
            self.rollup.utc_offset_minutes.unsigned_abs() <= MAX_UTC_OFFSET_MINUTES,
            "rollup.utc_offset_minutes must be within +/-{}, got {}",
            MAX_UTC_OFFSET_MINUTES,
            self.rollup.utc_offset_minutes
        );
        anyhow::ensure!(
            self.rollup.owner_refresh_secs > 0,
            "rollup.owner_refresh_secs must be > 0, got {}",
            self.rollup.owner_refresh_secs
        );
        if let Some(ref schedule) = self.rollup.schedule {
            cron::Schedule::from_str(schedule).map_err(|e| {
                anyhow::anyhow!("rollup.schedule is not a valid cron expression: {}", e)
            })?;
        }
        anyhow::ensure!(
            self.poll.month_window_days > 0
                && i64::from(self.poll.month_window_days) <= MAX_RANGE_DAYS,
            "poll.month_window_days must be between 1 and {}, got {}",
            MAX_RANGE_DAYS,
            self.poll.month_window_days
        );
        Ok(())
    }
}
