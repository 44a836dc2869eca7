//! Training load aggregation
//!
//! Folds activities into dense per-day load series (overall and per sport
//! family), pooled zone time and the hard-day count used by phase detection.

use crate::models::{window_start, ActivityRecord, FamilyTable, SportFamily, SPORT_FAMILIES};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cumulative hard-day ladder: (first zone index, seconds needed from that zone upward).
/// Higher zones need progressively less time to make a day hard.
pub const HARD_DAY_LADDER: [(usize, f64); 5] = [
    (2, 1800.0), // Z3+: 30 min tempo and above
    (3, 600.0),  // Z4+: 10 min threshold and above
    (4, 300.0),  // Z5+: 5 min VO2max and above
    (5, 120.0),  // Z6+: 2 min anaerobic and above
    (6, 60.0),   // Z7: 1 min neuromuscular
];

/// Seconds per zone summed across a set of activities
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneTotals {
    pub seconds: [f64; 7],
}

impl ZoneTotals {
    pub fn total(&self) -> f64 {
        self.seconds.iter().sum()
    }

    fn add(&mut self, zones: &[f64; 7]) {
        for (acc, secs) in self.seconds.iter_mut().zip(zones.iter()) {
            *acc += secs;
        }
    }

    /// Z4..Z7 pooled
    pub fn z4_plus(&self) -> f64 {
        self.seconds[3..].iter().sum()
    }

    /// Pooled (easy, moderate, hard) seconds of the Seiler 3-zone model:
    /// Z1+Z2, Z3, Z4..Z7
    pub fn seiler(&self) -> (f64, f64, f64) {
        (
            self.seconds[0] + self.seconds[1],
            self.seconds[2],
            self.z4_plus(),
        )
    }
}

/// Legacy 4-bucket polarisation view (Z1, Z2, Z3, Z4+) in hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDistribution {
    pub z1_hours: f64,
    pub z2_hours: f64,
    pub z3_hours: f64,
    pub z4_plus_hours: f64,
    pub total_hours: f64,
}

impl From<&ZoneTotals> for ZoneDistribution {
    fn from(totals: &ZoneTotals) -> Self {
        let hours = |secs: f64| crate::stats::round_dp(secs / 3600.0, 2);
        Self {
            z1_hours: hours(totals.seconds[0]),
            z2_hours: hours(totals.seconds[1]),
            z3_hours: hours(totals.seconds[2]),
            z4_plus_hours: hours(totals.z4_plus()),
            total_hours: hours(totals.total()),
        }
    }
}

/// Turns activity records into per-day load series and zone totals
pub struct LoadAggregator {
    families: FamilyTable,
}

impl LoadAggregator {
    /// Create aggregator using the default sport-family table
    pub fn new() -> Self {
        LoadAggregator {
            families: SPORT_FAMILIES,
        }
    }

    /// Create aggregator with a custom activity-type → family table
    pub fn with_family_table(families: FamilyTable) -> Self {
        LoadAggregator { families }
    }

    pub fn family_of(&self, activity: &ActivityRecord) -> SportFamily {
        activity.family(self.families)
    }

    /// Sum load per calendar day; records with an unparseable date are skipped
    pub fn aggregate_daily_load(&self, activities: &[ActivityRecord]) -> BTreeMap<NaiveDate, f64> {
        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();

        for activity in activities {
            if let Some(day) = activity.day() {
                *daily.entry(day).or_insert(0.0) += activity.load();
            }
        }

        daily
    }

    /// Dense `days`-long load series ending on `today`, oldest first; rest days are 0
    pub fn daily_series(&self, activities: &[ActivityRecord], today: NaiveDate, days: u32) -> Vec<f64> {
        let daily = self.aggregate_daily_load(activities);
        densify(&daily, today, days)
    }

    /// Dense series per sport family.
    ///
    /// Only families with at least one positive-load activity appear.
    pub fn family_series(
        &self,
        activities: &[ActivityRecord],
        today: NaiveDate,
        days: u32,
    ) -> BTreeMap<SportFamily, Vec<f64>> {
        let mut by_family: BTreeMap<SportFamily, BTreeMap<NaiveDate, f64>> = BTreeMap::new();

        for activity in activities {
            let load = activity.load();
            if load <= 0.0 {
                continue;
            }
            let Some(day) = activity.day() else {
                continue;
            };
            *by_family
                .entry(self.family_of(activity))
                .or_default()
                .entry(day)
                .or_insert(0.0) += load;
        }

        by_family
            .into_iter()
            .map(|(family, daily)| (family, densify(&daily, today, days)))
            .collect()
    }

    /// 7-zone totals, power preferred per activity with heart rate as fallback.
    /// With `family` set, only activities of that family count.
    pub fn zone_totals(&self, activities: &[ActivityRecord], family: Option<SportFamily>) -> ZoneTotals {
        let mut totals = ZoneTotals::default();

        for activity in activities {
            if let Some(f) = family {
                if self.family_of(activity) != f {
                    continue;
                }
            }
            if let Some(zones) = activity.zone_seconds() {
                totals.add(&zones);
            }
        }

        totals
    }

    /// Count days whose power-zone time climbs any rung of the hard-day ladder
    pub fn hard_days(&self, activities: &[ActivityRecord]) -> u32 {
        let mut per_day: BTreeMap<NaiveDate, [f64; 7]> = BTreeMap::new();

        for activity in activities {
            let Some(day) = activity.day() else {
                continue;
            };
            let entry = per_day.entry(day).or_insert([0.0; 7]);
            if let Some(zones) = activity.power_zone_seconds() {
                for (acc, secs) in entry.iter_mut().zip(zones.iter()) {
                    *acc += secs;
                }
            }
        }

        per_day.values().filter(|zones| is_hard_day(zones)).count() as u32
    }
}

impl Default for LoadAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// True when any cumulative rung of the ladder is met
pub fn is_hard_day(zones: &[f64; 7]) -> bool {
    HARD_DAY_LADDER
        .iter()
        .any(|(from, needed)| zones[*from..].iter().sum::<f64>() >= *needed)
}

fn densify(daily: &BTreeMap<NaiveDate, f64>, today: NaiveDate, days: u32) -> Vec<f64> {
    let start = window_start(today, days);
    start
        .iter_days()
        .take(days as usize)
        .map(|day| daily.get(&day).copied().unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn activity(date: NaiveDate, activity_type: &str, load: f64) -> ActivityRecord {
        serde_json::from_value(serde_json::json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "type": activity_type,
            "training_load": load,
        }))
        .unwrap()
    }

    fn with_power_zones(mut act: ActivityRecord, secs: [f64; 7]) -> ActivityRecord {
        act.power_zone_times = Some(
            secs.iter()
                .enumerate()
                .map(|(i, s)| crate::models::ZoneTime {
                    id: format!("Z{}", i + 1),
                    secs: Some(*s),
                })
                .collect(),
        );
        act
    }

    #[test]
    fn test_daily_series_is_dense_and_ordered() {
        let aggregator = LoadAggregator::new();
        let activities = vec![
            activity(day(28), "Ride", 50.0),
            activity(day(28), "Run", 30.0),
            activity(day(24), "Ride", 70.0),
            activity(day(10), "Ride", 999.0), // outside window
        ];

        let series = aggregator.daily_series(&activities, day(28), 7);
        assert_eq!(series, vec![0.0, 0.0, 70.0, 0.0, 0.0, 0.0, 80.0]);
    }

    #[test]
    fn test_malformed_dates_are_skipped() {
        let aggregator = LoadAggregator::new();
        let mut bad = activity(day(28), "Ride", 50.0);
        bad.date = "not-a-date".to_string();
        let activities = vec![bad, activity(day(28), "Ride", 20.0)];

        let series = aggregator.daily_series(&activities, day(28), 7);
        assert_eq!(series.iter().sum::<f64>(), 20.0);
    }

    #[test]
    fn test_family_series_excludes_zero_load_and_maps_unknown_to_other() {
        let aggregator = LoadAggregator::new();
        let activities = vec![
            activity(day(27), "VirtualRide", 60.0),
            activity(day(28), "Ride", 40.0),
            activity(day(28), "Yoga", 0.0),
            activity(day(26), "Kitesurf", 15.0),
        ];

        let series = aggregator.family_series(&activities, day(28), 7);
        assert_eq!(series.len(), 2);
        assert_eq!(series[&SportFamily::Cycling].iter().sum::<f64>(), 100.0);
        assert_eq!(series[&SportFamily::Other][4], 15.0);
    }

    #[test]
    fn test_zone_totals_and_legacy_view() {
        let aggregator = LoadAggregator::new();
        let activities = vec![with_power_zones(
            activity(day(28), "Ride", 80.0),
            [1800.0, 1800.0, 720.0, 360.0, 180.0, 0.0, 0.0],
        )];

        let totals = aggregator.zone_totals(&activities, None);
        assert_eq!(totals.total(), 4860.0);
        assert_eq!(totals.z4_plus(), 540.0);
        assert_eq!(totals.seiler(), (3600.0, 720.0, 540.0));

        let view = ZoneDistribution::from(&totals);
        assert_eq!(view.z1_hours, 0.5);
        assert_eq!(view.z4_plus_hours, 0.15);
        assert_eq!(view.total_hours, 1.35);
    }

    #[test]
    fn test_zone_totals_family_filter() {
        let aggregator = LoadAggregator::new();
        let mut run = activity(day(28), "Run", 40.0);
        run.hr_zone_times = Some(vec![Some(600.0), Some(600.0)]);
        let ride = with_power_zones(activity(day(28), "Ride", 60.0), [100.0; 7]);

        let activities = vec![run, ride];
        assert_eq!(aggregator.zone_totals(&activities, None).total(), 1900.0);
        assert_eq!(
            aggregator
                .zone_totals(&activities, Some(SportFamily::Run))
                .total(),
            1200.0
        );
    }

    #[test]
    fn test_hard_day_ladder() {
        assert!(is_hard_day(&[0.0, 0.0, 1800.0, 0.0, 0.0, 0.0, 0.0]));
        assert!(!is_hard_day(&[0.0, 0.0, 1799.0, 0.0, 0.0, 0.0, 0.0]));
        assert!(is_hard_day(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 60.0]));
        assert!(is_hard_day(&[0.0, 0.0, 0.0, 0.0, 200.0, 100.0, 0.0]));
        assert!(!is_hard_day(&[3600.0, 3600.0, 0.0, 500.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_hard_days_sums_sessions_per_day_and_ignores_hr_zones() {
        let aggregator = LoadAggregator::new();
        let mut hr_only = activity(day(25), "Run", 60.0);
        hr_only.hr_zone_times = Some(vec![None, None, None, Some(3600.0)]);

        let activities = vec![
            with_power_zones(activity(day(27), "Ride", 40.0), [0.0, 0.0, 0.0, 300.0, 0.0, 0.0, 0.0]),
            with_power_zones(activity(day(27), "Ride", 40.0), [0.0, 0.0, 0.0, 300.0, 0.0, 0.0, 0.0]),
            with_power_zones(activity(day(28), "Ride", 40.0), [0.0, 0.0, 0.0, 300.0, 0.0, 0.0, 0.0]),
            hr_only,
        ];

        assert_eq!(aggregator.hard_days(&activities), 1);
    }
}
