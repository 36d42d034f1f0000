// node_info_hour: one row per (node_id, bucket_start).

use super::StatsRepo;
use crate::models::HourlyRecord;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub(super) async fn init_hourly_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS node_info_hour (
            node_id TEXT NOT NULL,
            user_id TEXT,
            bucket_start INTEGER NOT NULL,
            hour_income REAL NOT NULL,
            online_time REAL NOT NULL,
            disk_usage REAL NOT NULL,
            latency REAL NOT NULL,
            pkg_loss_ratio REAL NOT NULL,
            nat_ratio REAL NOT NULL,
            PRIMARY KEY (node_id, bucket_start)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_node_info_hour_bucket ON node_info_hour(bucket_start)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

impl StatsRepo {
    #[instrument(skip(self, records), fields(repo = "stats", operation = "bulk_upsert_hourly", records_count = records.len()))]
    pub async fn bulk_upsert_hourly(&self, records: &[HourlyRecord]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for r in records {
            sqlx::query(
                r#"
                INSERT INTO node_info_hour
                (node_id, user_id, bucket_start, hour_income, online_time,
                 disk_usage, latency, pkg_loss_ratio, nat_ratio)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT(node_id, bucket_start) DO UPDATE SET
                    user_id = COALESCE(excluded.user_id, node_info_hour.user_id),
                    hour_income = excluded.hour_income,
                    online_time = excluded.online_time,
                    disk_usage = excluded.disk_usage,
                    latency = excluded.latency,
                    pkg_loss_ratio = excluded.pkg_loss_ratio,
                    nat_ratio = excluded.nat_ratio
                "#,
            )
            .bind(&r.node_id)
            .bind(&r.user_id)
            .bind(r.bucket_start)
            .bind(r.hour_income)
            .bind(r.online_time)
            .bind(r.disk_usage)
            .bind(r.latency)
            .bind(r.pkg_loss_ratio)
            .bind(r.nat_ratio)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Hourly rows of all nodes in [from_ts, to_ts). Order: node_id, then bucket_start.
    #[instrument(skip(self), fields(repo = "stats", operation = "get_hourly_by_time_range"))]
    pub async fn get_hourly_by_time_range(
        &self,
        from_ts: i64,
        to_ts: i64,
    ) -> anyhow::Result<Vec<HourlyRecord>> {
        let rows = sqlx::query(
            "SELECT node_id, user_id, bucket_start, hour_income, online_time,
                    disk_usage, latency, pkg_loss_ratio, nat_ratio
             FROM node_info_hour
             WHERE bucket_start >= $1 AND bucket_start < $2
             ORDER BY node_id ASC, bucket_start ASC",
        )
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_hourly_row).collect()
    }

    /// Hourly rows of one node in [from_ts, to_ts), ascending by bucket_start.
    pub async fn get_node_hourly(
        &self,
        node_id: &str,
        from_ts: i64,
        to_ts: i64,
    ) -> anyhow::Result<Vec<HourlyRecord>> {
        let rows = sqlx::query(
            "SELECT node_id, user_id, bucket_start, hour_income, online_time,
                    disk_usage, latency, pkg_loss_ratio, nat_ratio
             FROM node_info_hour
             WHERE node_id = $1 AND bucket_start >= $2 AND bucket_start < $3
             ORDER BY bucket_start ASC",
        )
        .bind(node_id)
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_hourly_row).collect()
    }

    pub async fn count_hourly(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM node_info_hour")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

fn parse_hourly_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<HourlyRecord> {
    Ok(HourlyRecord {
        node_id: row.try_get("node_id")?,
        user_id: row.try_get("user_id")?,
        bucket_start: row.try_get("bucket_start")?,
        hour_income: row.try_get("hour_income")?,
        online_time: row.try_get("online_time")?,
        disk_usage: row.try_get("disk_usage")?,
        latency: row.try_get("latency")?,
        pkg_loss_ratio: row.try_get("pkg_loss_ratio")?,
        nat_ratio: row.try_get("nat_ratio")?,
    })
}
