// Model serialization tests: lenient snapshot numbers, poll wire shape, series shape

use nodestats::models::{DailyRecord, DailyStatistic, IncomePoint, RuntimeSnapshot};
use nodestats::sync::{PollRequest, PollResponse, Section};
use std::collections::BTreeMap;

#[test]
fn test_snapshot_accepts_numbers_and_numeric_strings() {
    let json = r#"{
        "node_id": "n1",
        "recorded_at": 1709251200000,
        "cumulative_profit": "12.5",
        "online_time": 3600,
        "latency": " 20 ",
        "pkg_loss_ratio": "",
        "nat_ratio": "n/a",
        "cpu_cores": 8
    }"#;
    let s: RuntimeSnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(s.node_id, "n1");
    assert_eq!(s.user_id, None);
    assert_eq!(s.cumulative_profit, 12.5);
    assert_eq!(s.online_time, 3600.0);
    assert_eq!(s.latency, 20.0);
    assert_eq!(s.pkg_loss_ratio, 0.0);
    assert_eq!(s.nat_ratio, 0.0);
    assert_eq!(s.disk_space, 0.0);
    assert_eq!(s.cpu_cores, 8);
}

#[test]
fn test_snapshot_null_metric_is_zero() {
    let s: RuntimeSnapshot =
        serde_json::from_str(r#"{"node_id": "n1", "latency": null}"#).unwrap();
    assert_eq!(s.latency, 0.0);
    assert_eq!(s.recorded_at, 0);
}

#[test]
fn test_poll_request_defaults() {
    let req: PollRequest = serde_json::from_str(r#"{"node_id": "n1"}"#).unwrap();
    assert!(req.keys.is_empty());
    assert_eq!(req.since, 0);
}

#[test]
fn test_poll_response_flattens_sections() {
    let mut sections = BTreeMap::new();
    sections.insert(
        "income".to_string(),
        Section::Totals {
            today: 1.5,
            total: 10.0,
        },
    );
    sections.insert(
        "day_incomes".to_string(),
        Section::Series(vec![IncomePoint {
            k: "01:00".into(),
            v: 0.5,
        }]),
    );
    let resp = PollResponse {
        since: 1_709_251_200,
        sections,
    };

    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "since": 1_709_251_200,
            "income": {"today": 1.5, "total": 10.0},
            "day_incomes": [{"k": "01:00", "v": 0.5}],
        })
    );
}

#[test]
fn test_daily_statistic_placeholder_serializes_nulls() {
    let value = serde_json::to_value(DailyStatistic::placeholder("2024-03-01".into())).unwrap();
    assert_eq!(value["date"], "2024-03-01");
    assert_eq!(value["income"], 0.0);
    assert!(value["latency"].is_null());
}

#[test]
fn test_daily_statistic_from_record() {
    let record = DailyRecord {
        node_id: "n1".into(),
        user_id: None,
        date: "2024-03-01".into(),
        income: 4.0,
        online_time: 60.0,
        disk_usage: 0.5,
        latency: 12.0,
        pkg_loss_ratio: 0.0,
        nat_ratio: 1.0,
    };
    let stat = DailyStatistic::from(&record);
    assert_eq!(stat.income, 4.0);
    assert_eq!(stat.latency, Some(12.0));
}
