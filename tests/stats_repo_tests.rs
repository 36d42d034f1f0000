// StatsRepo tests: init, snapshot upsert, hourly/daily upserts, range sums, profiles, owners

mod common;

use chrono::NaiveDate;
use common::{DAY, HOUR, MAR_1, hourly, snapshot, test_repo};
use nodestats::models::{DailyRecord, ProfileDelta, ProfitWindowSet};
use nodestats::stats_repo::StatsRepo;
use tempfile::TempDir;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn daily(node_id: &str, user_id: Option<&str>, date: &str, income: f64) -> DailyRecord {
    DailyRecord {
        node_id: node_id.into(),
        user_id: user_id.map(str::to_owned),
        date: date.into(),
        income,
        online_time: income * 10.0,
        disk_usage: 0.5,
        latency: 20.0,
        pkg_loss_ratio: 0.0,
        nat_ratio: 1.0,
    }
}

#[tokio::test]
async fn stats_repo_connect_and_init_twice() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/stats.db");
    let repo = StatsRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    // Second init is no-op (IF NOT EXISTS)
    repo.init().await.unwrap();
    assert_eq!(repo.count_hourly().await.unwrap(), 0);
    assert_eq!(repo.count_daily().await.unwrap(), 0);
}

#[tokio::test]
async fn snapshot_upsert_replaces_latest_and_keeps_user() {
    let (_dir, repo) = test_repo().await;
    let mut first = snapshot("n1", MAR_1, 10.0, 1.0);
    first.user_id = Some("alice".into());
    repo.upsert_snapshots(&[first], MAR_1).await.unwrap();
    repo.upsert_snapshots(&[snapshot("n1", MAR_1 + HOUR, 25.0, 2.0)], MAR_1 + HOUR)
        .await
        .unwrap();

    let all = repo.get_runtime_snapshots().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].cumulative_profit, 25.0);

    let profile = repo.get_profile("n1").await.unwrap().unwrap();
    assert_eq!(profile.user_id.as_deref(), Some("alice"));
    assert_eq!(profile.updated_at, MAR_1 + HOUR);
    assert_eq!(profile.cpu_cores, 4);
    assert_eq!(profile.today_profit, 0.0);
}

#[tokio::test]
async fn get_profile_unknown_node_is_none() {
    let (_dir, repo) = test_repo().await;
    assert!(repo.get_profile("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn hourly_upsert_is_keyed_on_node_and_bucket() {
    let (_dir, repo) = test_repo().await;
    repo.bulk_upsert_hourly(&[hourly("n1", None, MAR_1, 1.0), hourly("n2", None, MAR_1, 2.0)])
        .await
        .unwrap();
    repo.bulk_upsert_hourly(&[hourly("n1", Some("u"), MAR_1, 5.0)])
        .await
        .unwrap();
    assert_eq!(repo.count_hourly().await.unwrap(), 2);

    let rows = repo.get_node_hourly("n1", MAR_1, MAR_1 + 1).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].hour_income, 5.0);
    assert_eq!(rows[0].user_id.as_deref(), Some("u"));
}

#[tokio::test]
async fn hourly_time_range_is_half_open() {
    let (_dir, repo) = test_repo().await;
    repo.bulk_upsert_hourly(&[
        hourly("n1", None, MAR_1 - 1, 0.0),
        hourly("n1", None, MAR_1, 1.0),
        hourly("n1", None, MAR_1 + DAY - 1, 2.0),
        hourly("n1", None, MAR_1 + DAY, 3.0),
    ])
    .await
    .unwrap();

    let rows = repo.get_hourly_by_time_range(MAR_1, MAR_1 + DAY).await.unwrap();
    let buckets: Vec<i64> = rows.iter().map(|r| r.bucket_start).collect();
    assert_eq!(buckets, vec![MAR_1, MAR_1 + DAY - 1]);
}

#[tokio::test]
async fn daily_upsert_overwrites_same_day() {
    let (_dir, repo) = test_repo().await;
    repo.bulk_upsert_daily(&[daily("n1", Some("u"), "2024-03-01", 5.0)], 1)
        .await
        .unwrap();
    repo.bulk_upsert_daily(&[daily("n1", None, "2024-03-01", 7.0)], 2)
        .await
        .unwrap();
    assert_eq!(repo.count_daily().await.unwrap(), 1);

    let rows = repo
        .get_node_daily("n1", d(2024, 3, 1), d(2024, 3, 1))
        .await
        .unwrap();
    assert_eq!(rows[0].income, 7.0);
    // Missing owner on re-aggregation keeps the stored one.
    assert_eq!(rows[0].user_id.as_deref(), Some("u"));
}

#[tokio::test]
async fn sum_daily_by_node_is_inclusive() {
    let (_dir, repo) = test_repo().await;
    repo.bulk_upsert_daily(
        &[
            daily("n1", None, "2024-02-29", 100.0),
            daily("n1", None, "2024-03-01", 1.0),
            daily("n1", None, "2024-03-02", 2.0),
            daily("n2", None, "2024-03-02", 4.0),
            daily("n1", None, "2024-03-03", 100.0),
        ],
        0,
    )
    .await
    .unwrap();

    let sums = repo
        .sum_daily_by_node(d(2024, 3, 1), d(2024, 3, 2))
        .await
        .unwrap();
    assert_eq!(sums.len(), 2);
    assert_eq!(sums[0].node_id, "n1");
    assert_eq!(sums[0].income, 3.0);
    assert_eq!(sums[0].online_time, 30.0);
    assert_eq!(sums[1].node_id, "n2");
    assert_eq!(sums[1].income, 4.0);
}

#[tokio::test]
async fn user_daily_sums_counters_and_averages_ratios() {
    let (_dir, repo) = test_repo().await;
    let mut a = daily("n1", Some("alice"), "2024-03-01", 2.0);
    a.latency = 10.0;
    let mut b = daily("n2", Some("alice"), "2024-03-01", 3.0);
    b.latency = 30.0;
    repo.bulk_upsert_daily(&[a, b, daily("n3", Some("bob"), "2024-03-01", 50.0)], 0)
        .await
        .unwrap();

    let stats = repo
        .get_user_daily("alice", d(2024, 3, 1), d(2024, 3, 2))
        .await
        .unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].income, 5.0);
    assert_eq!(stats[0].latency, Some(20.0));
}

#[tokio::test]
async fn profile_update_keeps_fields_without_data() {
    let (_dir, repo) = test_repo().await;
    repo.upsert_snapshots(&[snapshot("n1", MAR_1, 0.0, 0.0)], MAR_1)
        .await
        .unwrap();

    let full = ProfitWindowSet {
        today: Some(1.0),
        yesterday: Some(2.0),
        seven_days: Some(3.0),
        month: Some(4.0),
        today_online_time: Some(5.0),
    };
    repo.bulk_update_profiles(
        &[ProfileDelta {
            node_id: "n1".into(),
            windows: full,
        }],
        MAR_1 + 1,
    )
    .await
    .unwrap();

    let partial = ProfitWindowSet {
        today: Some(9.0),
        ..Default::default()
    };
    let touched = repo
        .bulk_update_profiles(
            &[
                ProfileDelta {
                    node_id: "n1".into(),
                    windows: partial.clone(),
                },
                ProfileDelta {
                    node_id: "ghost".into(),
                    windows: partial,
                },
            ],
            MAR_1 + 2,
        )
        .await
        .unwrap();
    assert_eq!(touched, 1);

    let p = repo.get_profile("n1").await.unwrap().unwrap();
    assert_eq!(p.today_profit, 9.0);
    assert_eq!(p.yesterday_profit, 2.0);
    assert_eq!(p.seven_days_profit, 3.0);
    assert_eq!(p.month_profit, 4.0);
    assert_eq!(p.today_online_time, 5.0);
    assert_eq!(p.updated_at, MAR_1 + 2);
}

#[tokio::test]
async fn owners_replace_and_load() {
    let (_dir, repo) = test_repo().await;
    repo.replace_owners(&[("n1".into(), "alice".into()), ("n2".into(), "bob".into())])
        .await
        .unwrap();
    repo.replace_owners(&[("n1".into(), "carol".into())])
        .await
        .unwrap();

    let owners = repo.load_owners().await.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners.user_of("n1"), Some("carol"));
    assert_eq!(owners.user_of("n2"), None);
}

#[tokio::test]
async fn snapshot_updated_at_is_ingest_time_and_older_snapshots_are_ignored() {
    let (_dir, repo) = test_repo().await;
    // Node clock runs a day behind the server.
    repo.upsert_snapshots(&[snapshot("n1", MAR_1 - DAY, 10.0, 1.0)], MAR_1)
        .await
        .unwrap();
    let p = repo.get_profile("n1").await.unwrap().unwrap();
    assert_eq!(p.recorded_at, MAR_1 - DAY);
    assert_eq!(p.updated_at, MAR_1);

    // Arrives later but was recorded earlier: stored snapshot wins.
    repo.upsert_snapshots(&[snapshot("n1", MAR_1 - 2 * DAY, 3.0, 0.5)], MAR_1 + HOUR)
        .await
        .unwrap();
    let p = repo.get_profile("n1").await.unwrap().unwrap();
    assert_eq!(p.cumulative_profit, 10.0);
    assert_eq!(p.updated_at, MAR_1);

    let all = repo.get_runtime_snapshots().await.unwrap();
    assert_eq!(all[0].recorded_at, MAR_1 - DAY);
}

#[tokio::test]
async fn hourly_reupsert_without_owner_keeps_stored_owner() {
    let (_dir, repo) = test_repo().await;
    repo.bulk_upsert_hourly(&[hourly("n1", Some("alice"), MAR_1, 1.0)])
        .await
        .unwrap();
    repo.bulk_upsert_hourly(&[hourly("n1", None, MAR_1, 2.0)])
        .await
        .unwrap();

    let rows = repo.get_node_hourly("n1", MAR_1, MAR_1 + 1).await.unwrap();
    assert_eq!(rows[0].hour_income, 2.0);
    assert_eq!(rows[0].user_id.as_deref(), Some("alice"));
}

#[tokio::test]
async fn unchanged_profit_windows_leave_profile_untouched() {
    let (_dir, repo) = test_repo().await;
    repo.upsert_snapshots(&[snapshot("n1", MAR_1, 0.0, 0.0)], MAR_1)
        .await
        .unwrap();
    let delta = ProfileDelta {
        node_id: "n1".into(),
        windows: ProfitWindowSet {
            today: Some(4.0),
            ..Default::default()
        },
    };

    assert_eq!(repo.bulk_update_profiles(&[delta.clone()], MAR_1 + 1).await.unwrap(), 1);
    assert_eq!(repo.bulk_update_profiles(&[delta], MAR_1 + 2).await.unwrap(), 0);
    let p = repo.get_profile("n1").await.unwrap().unwrap();
    assert_eq!(p.updated_at, MAR_1 + 1);
}

#[tokio::test]
async fn unchanged_daily_row_keeps_its_updated_at() {
    let (dir, repo) = test_repo().await;
    let row = daily("n1", Some("u"), "2024-03-01", 5.0);
    repo.bulk_upsert_daily(&[row.clone()], 1).await.unwrap();
    repo.bulk_upsert_daily(&[row.clone()], 2).await.unwrap();

    let db_url = format!("sqlite:{}", dir.path().join("stats.db").display());
    let side = sqlx::SqlitePool::connect(&db_url).await.unwrap();
    let stamp = || {
        sqlx::query_scalar::<_, i64>("SELECT updated_at FROM node_info_daily WHERE node_id = 'n1'")
            .fetch_one(&side)
    };
    assert_eq!(stamp().await.unwrap(), 1);

    repo.bulk_upsert_daily(&[daily("n1", None, "2024-03-01", 6.0)], 3)
        .await
        .unwrap();
    assert_eq!(stamp().await.unwrap(), 3);
    side.close().await;
}
