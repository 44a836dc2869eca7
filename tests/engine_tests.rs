use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use trainload::alerts::{AlertEngine, Severity};
use trainload::benchmark::{EquipmentContext, ThresholdHistory};
use trainload::engine::{ReadinessEngine, ReadinessReport};
use trainload::models::TrainingSnapshot;
use trainload::race::LoadBand;

/// End-to-end tests driving the readiness engine over whole snapshots

fn as_of() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 28)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

fn day(d: u32) -> String {
    format!("2024-09-{:02}", d)
}

fn ride(d: u32, load: f64) -> Value {
    json!({"date": day(d), "type": "Ride", "training_load": load, "moving_time": 3600})
}

fn wellness(d: u32, hrv: f64, rhr: f64) -> Value {
    json!({"date": day(d), "hrv": hrv, "resting_hr": rhr})
}

fn snapshot(value: Value) -> TrainingSnapshot {
    serde_json::from_value(value).unwrap()
}

fn run(snapshot: &TrainingSnapshot) -> ReadinessReport {
    ReadinessEngine::new().run(snapshot, ThresholdHistory::default(), as_of())
}

/// A week of 100-load rides after three empty weeks, with a sharp HRV drop today
fn overload_snapshot() -> TrainingSnapshot {
    let activities: Vec<Value> = (22..=28).map(|d| ride(d, 100.0)).collect();
    let mut days: Vec<Value> = (22..=27).map(|d| wellness(d, 60.0, 50.0)).collect();
    days.push(wellness(28, 38.0, 50.0));

    snapshot(json!({
        "profile": {"athlete_id": "athlete-1"},
        "activities": activities,
        "wellness": days,
    }))
}

#[test]
fn test_hrv_validity_filter_end_to_end() {
    let days = vec![
        wellness(22, 50.0, 48.0),
        wellness(23, 50.0, 48.0),
        wellness(24, 255.0, 48.0),
        wellness(25, 249.0, 48.0),
        wellness(26, 50.0, 48.0),
        wellness(27, 50.0, 48.0),
        wellness(28, 50.0, 48.0),
    ];
    let report = run(&snapshot(json!({"wellness": days})));
    let dm = &report.derived_metrics;

    // 255 dropped, 249 kept: (5 × 50 + 249) / 6
    assert_eq!(dm.data_quality.hrv_data_points, 6);
    assert_eq!(dm.hrv_baseline_7d, Some(83.2));
    assert_eq!(dm.latest_hrv, Some(50.0));
    assert_eq!(report.weekly_summary.avg_hrv, Some(83.2));
}

#[test]
fn test_tier_one_warning_precedes_tier_two_alarm() {
    let report = run(&overload_snapshot());
    let dm = &report.derived_metrics;

    assert_eq!(dm.acwr, Some(4.0));
    assert_eq!(dm.recovery_index, Some(0.67));

    let first = &report.alerts[0];
    assert_eq!(first.tier, 1);
    assert_eq!(first.severity, Severity::Warning);

    let acwr = report.alerts.iter().position(|a| a.metric == "acwr").unwrap();
    assert_eq!(report.alerts[acwr].severity, Severity::Alarm);
    assert!(report.alerts[..acwr].iter().all(|a| a.tier == 1));

    for pair in report.alerts.windows(2) {
        let key = |a: &trainload::Alert| (a.tier, a.severity.rank());
        assert!(key(&pair[0]) <= key(&pair[1]));
    }
}

#[test]
fn test_hrv_alert_carries_persistence() {
    let report = run(&overload_snapshot());
    let hrv = report.alerts.iter().find(|a| a.metric == "hrv").unwrap();
    assert_eq!(hrv.severity, Severity::Warning);
    assert_eq!(hrv.persistence_days, Some(1));
}

#[test]
fn test_race_week_d5_load_targets() {
    let report = run(&snapshot(json!({
        "wellness_today": {"date": day(28), "ctl": 50.0, "atl": 50.0},
        "events": [{"date": "2024-10-03", "category": "RACE_A", "name": "Nationals"}]
    })));

    let week = report.race_calendar.race_week.protocol().unwrap();
    assert_eq!(week.current_day, "D-5");
    assert_eq!(week.today.load_target_tss, Some(LoadBand { min: 20, max: 30 }));
    assert_eq!(week.race_week_tss_budget.min, 140);
    assert_eq!(week.race_week_tss_spent, 0);
    assert_eq!(week.projected_race_day_tsb, 19.9);

    let race_alert = report.alerts.iter().find(|a| a.metric == "race_week").unwrap();
    assert_eq!(race_alert.tier, 1);
    assert_eq!(race_alert.severity, Severity::Info);
    assert!(race_alert.context.contains("Moderate endurance, 20-30 TSS"));
    assert!(!report.alerts.iter().any(|a| a.metric == "race_week_tsb"));
}

#[test]
fn test_deload_suppresses_monotony_alarm() {
    let mut dm = run(&overload_snapshot()).derived_metrics;
    dm.monotony = Some(2.6);
    dm.effective_monotony = Some(2.6);
    dm.multi_sport_detected = false;
    // 28-day weekly average 400; 7-day load 40% below it
    dm.tss_7d_total = 240.0;
    dm.tss_28d_total = 1600.0;

    let alerts = AlertEngine::new().evaluate(&dm, &[]);
    let monotony = alerts.iter().find(|a| a.metric == "monotony").unwrap();
    assert_eq!(monotony.severity, Severity::Info);
    assert!(monotony.context.contains("deload pattern detected"));

    dm.tss_7d_total = 400.0;
    let alerts = AlertEngine::new().evaluate(&dm, &[]);
    let monotony = alerts.iter().find(|a| a.metric == "monotony").unwrap();
    assert_eq!(monotony.severity, Severity::Alarm);
}

#[test]
fn test_consistency_index_end_to_end() {
    let events: Vec<Value> = (22..=26)
        .map(|d| json!({"date": day(d), "category": "WORKOUT"}))
        .collect();
    let activities = vec![
        ride(22, 60.0),
        ride(23, 60.0),
        ride(26, 60.0),
        json!({"date": day(24), "type": "Run", "training_load": 40.0}),
    ];
    let report = run(&snapshot(json!({"activities": activities, "events": events})));

    let dm = &report.derived_metrics;
    assert_eq!(dm.consistency_index, Some(0.6));
    assert_eq!(dm.consistency_details.planned_days, 5);
    assert_eq!(dm.consistency_details.matched_days, 3);
    assert_eq!(dm.data_quality.planned_workouts_7d, 5);
}

#[test]
fn test_threshold_history_file_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ftp_history.json");
    std::fs::write(&path, r#"{"2024-07-31": 270, "2024-09-01": 275}"#).unwrap();

    let history = ThresholdHistory::load(&path).unwrap();
    let snap = snapshot(json!({"profile": {"ftp_outdoor": 283, "ftp_indoor": 270}}));
    let report = ReadinessEngine::new().run(&snap, history, as_of());
    report.ftp_history.save(&path).unwrap();

    let reloaded = ThresholdHistory::load(&path).unwrap();
    assert_eq!(reloaded.latest(EquipmentContext::Outdoor), Some(283));
    assert_eq!(reloaded.latest(EquipmentContext::Indoor), Some(270));
    assert_eq!(report.derived_metrics.data_quality.ftp_history_days.outdoor, 59);

    let outdoor = &report.derived_metrics.benchmark_outdoor;
    assert_eq!(outdoor.ftp_8_weeks_ago, Some(270));
    assert_eq!(outdoor.benchmark_index, Some(0.048));
    assert_eq!(outdoor.benchmark_percentage.as_deref(), Some("+4.8%"));
}

#[test]
fn test_empty_snapshot_degrades_to_nulls() {
    let report = run(&TrainingSnapshot::default());
    let dm = &report.derived_metrics;

    assert_eq!(dm.acwr, None);
    assert_eq!(dm.monotony, None);
    assert_eq!(dm.recovery_index, None);
    assert_eq!(dm.primary_sport, None);
    assert!(report.alerts.is_empty());
    assert!(!report.race_calendar.race_week.is_active());

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["derived_metrics"]["acwr"].is_null());
    assert_eq!(json["race_calendar"]["race_week"], json!({"active": false}));
    assert_eq!(json["derived_metrics"]["phase_detected"], "Indeterminate");
}
