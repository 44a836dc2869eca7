//! Report summaries over the display window

use crate::baseline::BaselineCalculator;
use crate::models::{ActivityRecord, WellnessRecord};
use crate::stats::{mean, round_dp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub total_training_hours: f64,
    pub total_tss: f64,
    pub activities_count: usize,
    pub avg_hrv: Option<f64>,
    pub avg_resting_hr: Option<f64>,
}

impl WeeklySummary {
    /// Averages use the same HRV validity filter as the baselines
    pub fn compute(
        activities: &[ActivityRecord],
        wellness: &[WellnessRecord],
        baselines: &BaselineCalculator,
    ) -> Self {
        let hrv = baselines.valid_hrv_values(wellness);
        let rhr = baselines.rhr_values(wellness);

        WeeklySummary {
            total_training_hours: round_dp(total_seconds(activities) / SECONDS_PER_HOUR, 2),
            total_tss: round_dp(total_load(activities), 0),
            activities_count: activities.len(),
            avg_hrv: mean(&hrv).map(|m| round_dp(m, 1)),
            avg_resting_hr: mean(&rhr).map(|m| round_dp(m, 1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTypeSummary {
    pub duration_decimal_hours: f64,
    pub count: usize,
    pub tss: f64,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub period_description: String,
    pub note: String,
    pub total_duration_decimal_hours: f64,
    pub total_activities: usize,
    /// Keyed by activity type, alphabetical
    pub by_activity_type: BTreeMap<String, ActivityTypeSummary>,
}

#[derive(Default)]
struct TypeTotals {
    count: usize,
    seconds: f64,
    load: f64,
    km: f64,
}

impl ActivitySummary {
    pub fn compute(activities: &[ActivityRecord], days: u32) -> Self {
        let mut by_type: BTreeMap<String, TypeTotals> = BTreeMap::new();
        for activity in activities {
            let totals = by_type.entry(activity.activity_type.clone()).or_default();
            totals.count += 1;
            totals.seconds += activity.moving_seconds();
            totals.load += activity.load();
            totals.km += activity.distance.unwrap_or(0.0) / 1000.0;
        }

        let total_seconds: f64 = by_type.values().map(|t| t.seconds).sum();
        let by_activity_type = by_type
            .into_iter()
            .map(|(activity_type, t)| {
                (
                    activity_type,
                    ActivityTypeSummary {
                        duration_decimal_hours: round_dp(t.seconds / SECONDS_PER_HOUR, 2),
                        count: t.count,
                        tss: round_dp(t.load, 0),
                        distance_km: round_dp(t.km, 1),
                    },
                )
            })
            .collect();

        ActivitySummary {
            period_description: format!("Last {} days of training (including today)", days),
            note: "Duration calculated from API moving_time field.".to_string(),
            total_duration_decimal_hours: round_dp(total_seconds / SECONDS_PER_HOUR, 2),
            total_activities: activities.len(),
            by_activity_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickStats {
    pub total_training_hours: f64,
    pub total_activities: usize,
    pub total_tss: f64,
}

impl QuickStats {
    pub fn compute(activities: &[ActivityRecord]) -> Self {
        QuickStats {
            total_training_hours: round_dp(total_seconds(activities) / SECONDS_PER_HOUR, 2),
            total_activities: activities.len(),
            total_tss: round_dp(total_load(activities), 0),
        }
    }
}

fn total_seconds(activities: &[ActivityRecord]) -> f64 {
    activities.iter().map(|a| a.moving_seconds()).sum()
}

fn total_load(activities: &[ActivityRecord]) -> f64 {
    activities.iter().map(|a| a.load()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(activity_type: &str, moving: f64, load: f64, distance: f64) -> ActivityRecord {
        serde_json::from_value(serde_json::json!({
            "date": "2024-09-20",
            "type": activity_type,
            "moving_time": moving,
            "training_load": load,
            "distance": distance,
        }))
        .unwrap()
    }

    fn sample() -> Vec<ActivityRecord> {
        vec![
            activity("Ride", 5400.0, 80.0, 45_250.0),
            activity("Run", 2700.0, 45.0, 9_120.0),
            activity("Ride", 3600.0, 52.0, 30_010.0),
        ]
    }

    #[test]
    fn test_activity_summary_groups_by_type() {
        let summary = ActivitySummary::compute(&sample(), 7);
        assert_eq!(summary.total_activities, 3);
        assert_eq!(summary.total_duration_decimal_hours, 3.25);
        let types: Vec<&String> = summary.by_activity_type.keys().collect();
        assert_eq!(types, vec!["Ride", "Run"]);

        let ride = &summary.by_activity_type["Ride"];
        assert_eq!(ride.count, 2);
        assert_eq!(ride.tss, 132.0);
        assert_eq!(ride.distance_km, 75.3);
        assert_eq!(ride.duration_decimal_hours, 2.5);
        assert_eq!(summary.period_description, "Last 7 days of training (including today)");
    }

    #[test]
    fn test_weekly_summary_filters_invalid_hrv() {
        let wellness: Vec<WellnessRecord> = [Some(50.0), Some(300.0), Some(61.0)]
            .into_iter()
            .map(|hrv| WellnessRecord {
                date: "2024-09-20".to_string(),
                hrv,
                resting_hr: Some(48.0),
                ..WellnessRecord::default()
            })
            .collect();

        let weekly = WeeklySummary::compute(&sample(), &wellness, &BaselineCalculator::new());
        assert_eq!(weekly.avg_hrv, Some(55.5));
        assert_eq!(weekly.avg_resting_hr, Some(48.0));
        assert_eq!(weekly.total_tss, 177.0);
        assert_eq!(weekly.activities_count, 3);
    }

    #[test]
    fn test_quick_stats_empty() {
        let stats = QuickStats::compute(&[]);
        assert_eq!(stats.total_training_hours, 0.0);
        assert_eq!(stats.total_tss, 0.0);
    }
}
