// node_info_daily: one row per (node_id, date). Dates are `YYYY-MM-DD` text, so range
// filters compare lexically.

use super::StatsRepo;
use crate::models::{DailyRecord, DailyStatistic, WindowSum};
use crate::timebucket::format_date;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub(super) async fn init_daily_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS node_info_daily (
            node_id TEXT NOT NULL,
            user_id TEXT,
            date TEXT NOT NULL,
            income REAL NOT NULL,
            online_time REAL NOT NULL,
            disk_usage REAL NOT NULL,
            latency REAL NOT NULL,
            pkg_loss_ratio REAL NOT NULL,
            nat_ratio REAL NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (node_id, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_node_info_daily_date ON node_info_daily(date)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_node_info_daily_user ON node_info_daily(user_id, date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

impl StatsRepo {
    #[instrument(skip(self, records), fields(repo = "stats", operation = "bulk_upsert_daily", records_count = records.len()))]
    pub async fn bulk_upsert_daily(
        &self,
        records: &[DailyRecord],
        updated_at: i64,
    ) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for r in records {
            sqlx::query(
                r#"
                INSERT INTO node_info_daily
                (node_id, user_id, date, income, online_time,
                 disk_usage, latency, pkg_loss_ratio, nat_ratio, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT(node_id, date) DO UPDATE SET
                    user_id = COALESCE(excluded.user_id, node_info_daily.user_id),
                    income = excluded.income,
                    online_time = excluded.online_time,
                    disk_usage = excluded.disk_usage,
                    latency = excluded.latency,
                    pkg_loss_ratio = excluded.pkg_loss_ratio,
                    nat_ratio = excluded.nat_ratio,
                    updated_at = excluded.updated_at
                WHERE excluded.user_id IS NOT NULL AND excluded.user_id IS NOT node_info_daily.user_id
                    OR excluded.income IS NOT node_info_daily.income
                    OR excluded.online_time IS NOT node_info_daily.online_time
                    OR excluded.disk_usage IS NOT node_info_daily.disk_usage
                    OR excluded.latency IS NOT node_info_daily.latency
                    OR excluded.pkg_loss_ratio IS NOT node_info_daily.pkg_loss_ratio
                    OR excluded.nat_ratio IS NOT node_info_daily.nat_ratio
                "#,
            )
            .bind(&r.node_id)
            .bind(&r.user_id)
            .bind(&r.date)
            .bind(r.income)
            .bind(r.online_time)
            .bind(r.disk_usage)
            .bind(r.latency)
            .bind(r.pkg_loss_ratio)
            .bind(r.nat_ratio)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Per-node income and online-time sums over the inclusive date range.
    #[instrument(skip(self), fields(repo = "stats", operation = "sum_daily_by_node"))]
    pub async fn sum_daily_by_node(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<WindowSum>> {
        let rows = sqlx::query(
            "SELECT node_id, SUM(income) AS income, SUM(online_time) AS online_time
             FROM node_info_daily
             WHERE date >= $1 AND date <= $2
             GROUP BY node_id
             ORDER BY node_id ASC",
        )
        .bind(format_date(from))
        .bind(format_date(to))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(WindowSum {
                node_id: row.try_get("node_id")?,
                income: row.try_get("income")?,
                online_time: row.try_get("online_time")?,
            });
        }
        Ok(out)
    }

    /// Daily rows of one node over the inclusive date range, ascending by date.
    pub async fn get_node_daily(
        &self,
        node_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<DailyRecord>> {
        let rows = sqlx::query(
            "SELECT node_id, user_id, date, income, online_time,
                    disk_usage, latency, pkg_loss_ratio, nat_ratio
             FROM node_info_daily
             WHERE node_id = $1 AND date >= $2 AND date <= $3
             ORDER BY date ASC",
        )
        .bind(node_id)
        .bind(format_date(from))
        .bind(format_date(to))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(DailyRecord {
                node_id: row.try_get("node_id")?,
                user_id: row.try_get("user_id")?,
                date: row.try_get("date")?,
                income: row.try_get("income")?,
                online_time: row.try_get("online_time")?,
                disk_usage: row.try_get("disk_usage")?,
                latency: row.try_get("latency")?,
                pkg_loss_ratio: row.try_get("pkg_loss_ratio")?,
                nat_ratio: row.try_get("nat_ratio")?,
            });
        }
        Ok(out)
    }

    /// One entry per day a user's nodes reported: counters summed, ratios averaged.
    #[instrument(skip(self), fields(repo = "stats", operation = "get_user_daily"))]
    pub async fn get_user_daily(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<DailyStatistic>> {
        let rows = sqlx::query(
            "SELECT date, SUM(income) AS income, SUM(online_time) AS online_time,
                    AVG(disk_usage) AS disk_usage, AVG(latency) AS latency,
                    AVG(pkg_loss_ratio) AS pkg_loss_ratio, AVG(nat_ratio) AS nat_ratio
             FROM node_info_daily
             WHERE user_id = $1 AND date >= $2 AND date <= $3
             GROUP BY date
             ORDER BY date ASC",
        )
        .bind(user_id)
        .bind(format_date(from))
        .bind(format_date(to))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(DailyStatistic {
                date: row.try_get("date")?,
                income: row.try_get("income")?,
                online_time: row.try_get("online_time")?,
                disk_usage: row.try_get("disk_usage")?,
                latency: row.try_get("latency")?,
                pkg_loss_ratio: row.try_get("pkg_loss_ratio")?,
                nat_ratio: row.try_get("nat_ratio")?,
            });
        }
        Ok(out)
    }

    pub async fn count_daily(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM node_info_daily")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
