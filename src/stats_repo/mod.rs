// SQLite store: node profiles (snapshot source + profit windows), hourly and daily rollups,
// node owner table. Bulk writes run in one transaction and are keyed upserts, so re-running
// a cycle for the same bucket or day overwrites instead of duplicating.

mod daily;
mod hourly;

use crate::models::{NodeProfile, ProfileDelta, RuntimeSnapshot};
use crate::owners::NodeOwners;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub struct StatsRepo {
    pool: SqlitePool,
}

impl StatsRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS node_profile (
                node_id TEXT PRIMARY KEY,
                user_id TEXT,
                cumulative_profit REAL NOT NULL DEFAULT 0,
                online_time REAL NOT NULL DEFAULT 0,
                disk_usage REAL NOT NULL DEFAULT 0,
                latency REAL NOT NULL DEFAULT 0,
                pkg_loss_ratio REAL NOT NULL DEFAULT 0,
                nat_ratio REAL NOT NULL DEFAULT 0,
                cpu_cores INTEGER NOT NULL DEFAULT 0,
                cpu_usage REAL NOT NULL DEFAULT 0,
                memory REAL NOT NULL DEFAULT 0,
                memory_usage REAL NOT NULL DEFAULT 0,
                disk_space REAL NOT NULL DEFAULT 0,
                today_profit REAL NOT NULL DEFAULT 0,
                yesterday_profit REAL NOT NULL DEFAULT 0,
                seven_days_profit REAL NOT NULL DEFAULT 0,
                month_profit REAL NOT NULL DEFAULT 0,
                today_online_time REAL NOT NULL DEFAULT 0,
                recorded_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS node_owners (node_id TEXT PRIMARY KEY, user_id TEXT NOT NULL)",
        )
        .execute(&self.pool)
        .await?;

        hourly::init_hourly_table(&self.pool).await?;
        daily::init_daily_table(&self.pool).await?;

        Ok(())
    }

    /// Stores the latest snapshot per node. A snapshot without a user_id keeps the stored one;
    /// a snapshot recorded before the stored one is ignored. `updated_at` is the server's
    /// `ingested_at`, never the node's own clock.
    #[instrument(skip(self, snapshots), fields(repo = "stats", operation = "upsert_snapshots", snapshots_count = snapshots.len()))]
    pub async fn upsert_snapshots(
        &self,
        snapshots: &[RuntimeSnapshot],
        ingested_at: i64,
    ) -> anyhow::Result<()> {
        if snapshots.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in snapshots {
            sqlx::query(
                r#"
                INSERT INTO node_profile
                (node_id, user_id, cumulative_profit, online_time, disk_usage, latency,
                 pkg_loss_ratio, nat_ratio, cpu_cores, cpu_usage, memory, memory_usage,
                 disk_space, recorded_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT(node_id) DO UPDATE SET
                    user_id = COALESCE(excluded.user_id, node_profile.user_id),
                    cumulative_profit = excluded.cumulative_profit,
                    online_time = excluded.online_time,
                    disk_usage = excluded.disk_usage,
                    latency = excluded.latency,
                    pkg_loss_ratio = excluded.pkg_loss_ratio,
                    nat_ratio = excluded.nat_ratio,
                    cpu_cores = excluded.cpu_cores,
                    cpu_usage = excluded.cpu_usage,
                    memory = excluded.memory,
                    memory_usage = excluded.memory_usage,
                    disk_space = excluded.disk_space,
                    recorded_at = excluded.recorded_at,
                    updated_at = excluded.updated_at
                WHERE excluded.recorded_at >= node_profile.recorded_at
                "#,
            )
            .bind(&s.node_id)
            .bind(&s.user_id)
            .bind(s.cumulative_profit)
            .bind(s.online_time)
            .bind(s.disk_usage)
            .bind(s.latency)
            .bind(s.pkg_loss_ratio)
            .bind(s.nat_ratio)
            .bind(s.cpu_cores as i64)
            .bind(s.cpu_usage)
            .bind(s.memory)
            .bind(s.memory_usage)
            .bind(s.disk_space)
            .bind(s.recorded_at)
            .bind(ingested_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Latest snapshot of every known node, ordered by node_id.
    #[instrument(skip(self), fields(repo = "stats", operation = "get_runtime_snapshots"))]
    pub async fn get_runtime_snapshots(&self) -> anyhow::Result<Vec<RuntimeSnapshot>> {
        let rows = sqlx::query(
            "SELECT node_id, user_id, cumulative_profit, online_time, disk_usage, latency,
                    pkg_loss_ratio, nat_ratio, cpu_cores, cpu_usage, memory, memory_usage,
                    disk_space, recorded_at
             FROM node_profile ORDER BY node_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(RuntimeSnapshot {
                node_id: row.try_get("node_id")?,
                user_id: row.try_get("user_id")?,
                recorded_at: row.try_get("recorded_at")?,
                cumulative_profit: row.try_get("cumulative_profit")?,
                online_time: row.try_get("online_time")?,
                disk_usage: row.try_get("disk_usage")?,
                pkg_loss_ratio: row.try_get("pkg_loss_ratio")?,
                latency: row.try_get("latency")?,
                nat_ratio: row.try_get("nat_ratio")?,
                cpu_cores: row.try_get::<i64, _>("cpu_cores")?.max(0) as u32,
                cpu_usage: row.try_get("cpu_usage")?,
                memory: row.try_get("memory")?,
                memory_usage: row.try_get("memory_usage")?,
                disk_space: row.try_get("disk_space")?,
            });
        }
        Ok(out)
    }

    pub async fn get_profile(&self, node_id: &str) -> anyhow::Result<Option<NodeProfile>> {
        let row = sqlx::query("SELECT * FROM node_profile WHERE node_id = $1")
            .bind(node_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Self::parse_profile_row(&row)?))
    }

    /// Applies profit windows to profiles. `None` fields keep their stored value. A profile
    /// whose windows already hold these values is left as is, `updated_at` included.
    /// Returns the number of profiles changed; unknown node ids are ignored.
    #[instrument(skip(self, deltas), fields(repo = "stats", operation = "bulk_update_profiles", deltas_count = deltas.len()))]
    pub async fn bulk_update_profiles(
        &self,
        deltas: &[ProfileDelta],
        updated_at: i64,
    ) -> anyhow::Result<u64> {
        if deltas.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let mut touched = 0;
        for d in deltas {
            let r = sqlx::query(
                r#"
                UPDATE node_profile SET
                    today_profit = COALESCE($2, today_profit),
                    yesterday_profit = COALESCE($3, yesterday_profit),
                    seven_days_profit = COALESCE($4, seven_days_profit),
                    month_profit = COALESCE($5, month_profit),
                    today_online_time = COALESCE($6, today_online_time),
                    updated_at = $7
                WHERE node_id = $1
                  AND (today_profit IS NOT COALESCE($2, today_profit)
                    OR yesterday_profit IS NOT COALESCE($3, yesterday_profit)
                    OR seven_days_profit IS NOT COALESCE($4, seven_days_profit)
                    OR month_profit IS NOT COALESCE($5, month_profit)
                    OR today_online_time IS NOT COALESCE($6, today_online_time))
                "#,
            )
            .bind(&d.node_id)
            .bind(d.windows.today)
            .bind(d.windows.yesterday)
            .bind(d.windows.seven_days)
            .bind(d.windows.month)
            .bind(d.windows.today_online_time)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
            touched += r.rows_affected();
        }
        tx.commit().await?;
        Ok(touched)
    }

    /// Replaces the whole owner table.
    #[instrument(skip(self, owners), fields(repo = "stats", operation = "replace_owners", owners_count = owners.len()))]
    pub async fn replace_owners(&self, owners: &[(String, String)]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM node_owners")
            .execute(&mut *tx)
            .await?;
        for (node_id, user_id) in owners {
            sqlx::query("INSERT OR REPLACE INTO node_owners (node_id, user_id) VALUES ($1, $2)")
                .bind(node_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn load_owners(&self) -> anyhow::Result<NodeOwners> {
        let rows = sqlx::query("SELECT node_id, user_id FROM node_owners")
            .fetch_all(&self.pool)
            .await?;
        let mut owners = Vec::with_capacity(rows.len());
        for row in rows {
            owners.push((row.try_get("node_id")?, row.try_get("user_id")?));
        }
        Ok(owners.into_iter().collect())
    }

    fn parse_profile_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<NodeProfile> {
        Ok(NodeProfile {
            node_id: row.try_get("node_id")?,
            user_id: row.try_get("user_id")?,
            cumulative_profit: row.try_get("cumulative_profit")?,
            online_time: row.try_get("online_time")?,
            disk_usage: row.try_get("disk_usage")?,
            latency: row.try_get("latency")?,
            pkg_loss_ratio: row.try_get("pkg_loss_ratio")?,
            nat_ratio: row.try_get("nat_ratio")?,
            cpu_cores: row.try_get::<i64, _>("cpu_cores")?.max(0) as u32,
            cpu_usage: row.try_get("cpu_usage")?,
            memory: row.try_get("memory")?,
            memory_usage: row.try_get("memory_usage")?,
            disk_space: row.try_get("disk_space")?,
            today_profit: row.try_get("today_profit")?,
            yesterday_profit: row.try_get("yesterday_profit")?,
            seven_days_profit: row.try_get("seven_days_profit")?,
            month_profit: row.try_get("month_profit")?,
            today_online_time: row.try_get("today_online_time")?,
            recorded_at: row.try_get("recorded_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
