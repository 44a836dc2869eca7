//! Fitness, fatigue and form (CTL / ATL / TSB)
//!
//! Resolves today's values from the wellness feed, falling back to yesterday's
//! values decayed by one zero-load day while planned workouts are unfinished.

use crate::models::{ActivityRecord, EventRecord, WellnessRecord};
use crate::stats::round_dp;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// CTL time constant in days
pub const CTL_TIME_CONSTANT: f64 = 42.0;

/// ATL time constant in days
pub const ATL_TIME_CONSTANT: f64 = 7.0;

/// One-day zero-load decay factor for fitness, e^(-1/42)
pub fn ctl_decay() -> f64 {
    (-1.0 / CTL_TIME_CONSTANT).exp()
}

/// One-day zero-load decay factor for fatigue, e^(-1/7)
pub fn atl_decay() -> f64 {
    (-1.0 / ATL_TIME_CONSTANT).exp()
}

const SOURCE_DECAYED: &str = "Decayed from yesterday (today's planned workouts not yet completed)";
const SOURCE_REPORTED: &str = "From wellness data (reflects completed workouts)";

/// Current fitness / fatigue / form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessSnapshot {
    pub ctl: Option<f64>,
    pub atl: Option<f64>,
    pub tsb: Option<f64>,
    pub ramp_rate: Option<f64>,
    pub fitness_source: String,
}

impl FitnessSnapshot {
    /// Pick between today's reported values and yesterday's values decayed one day.
    ///
    /// Reported values already include today's planned workouts, so while those
    /// are still unfinished the decayed values are the honest reading. Decayed
    /// values also stand in when today's are missing.
    pub fn resolve(
        today: NaiveDate,
        wellness_today: Option<&WellnessRecord>,
        wellness_yesterday: Option<&WellnessRecord>,
        events: &[EventRecord],
        activities: &[ActivityRecord],
    ) -> Self {
        let decay = |value: Option<f64>, factor: f64| {
            value.filter(|v| *v != 0.0).map(|v| round_dp(v * factor, 2))
        };
        let decayed_ctl = decay(wellness_yesterday.and_then(|w| w.ctl), ctl_decay());
        let decayed_atl = decay(wellness_yesterday.and_then(|w| w.atl), atl_decay());
        let decayed_ramp = decay(wellness_yesterday.and_then(|w| w.ramp_rate), ctl_decay());

        let reported = |value: Option<f64>| value.filter(|v| *v != 0.0).map(|v| round_dp(v, 2));
        let api_ctl = reported(wellness_today.and_then(|w| w.ctl));
        let api_atl = reported(wellness_today.and_then(|w| w.atl));
        let api_ramp = reported(wellness_today.and_then(|w| w.ramp_rate));

        let planned_today = events.iter().any(|e| e.day() == Some(today));
        let completed_today = activities.iter().any(|a| a.day() == Some(today));

        let (ctl, atl, ramp_rate, source) = if planned_today && !completed_today {
            (decayed_ctl, decayed_atl, decayed_ramp.or(api_ramp), SOURCE_DECAYED)
        } else {
            (
                api_ctl.or(decayed_ctl),
                api_atl.or(decayed_atl),
                api_ramp.or(decayed_ramp),
                SOURCE_REPORTED,
            )
        };

        let tsb = match (ctl, atl) {
            (Some(c), Some(a)) => Some(round_dp(c - a, 2)),
            _ => None,
        };

        tracing::debug!(?ctl, ?atl, ?tsb, source, "Resolved fitness snapshot");

        FitnessSnapshot {
            ctl,
            atl,
            tsb,
            ramp_rate,
            fitness_source: source.to_string(),
        }
    }

    /// Project CTL and ATL forward `days` with zero load; returns TSB (1 dp)
    pub fn project_tsb(&self, days: i64) -> f64 {
        let mut ctl = self.ctl.unwrap_or(0.0);
        let mut atl = self.atl.unwrap_or(0.0);
        for _ in 0..days.max(0) {
            ctl *= ctl_decay();
            atl *= atl_decay();
        }
        round_dp(ctl - atl, 1)
    }
}

/// Live cycling power-duration model estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerModel {
    pub eftp: Option<f64>,
    pub w_prime: Option<f64>,
    pub w_prime_kj: Option<f64>,
    pub p_max: Option<f64>,
    pub source: String,
}

impl PowerModel {
    /// Read the `Ride` entry of a wellness day's sport info
    pub fn from_wellness(wellness: Option<&WellnessRecord>) -> Self {
        let ride = wellness.and_then(|w| w.sport_info.iter().find(|s| s.sport_type == "Ride"));

        match ride {
            Some(info) => {
                let present = |v: Option<f64>| v.filter(|x| *x != 0.0);
                let w_prime = present(info.w_prime);
                PowerModel {
                    eftp: present(info.eftp).map(|v| round_dp(v, 1)),
                    w_prime: w_prime.map(|v| round_dp(v, 0)),
                    w_prime_kj: w_prime.map(|v| round_dp(v / 1000.0, 1)),
                    p_max: present(info.p_max).map(|v| round_dp(v, 0)),
                    source: "wellness.sportInfo".to_string(),
                }
            }
            None => PowerModel {
                eftp: None,
                w_prime: None,
                w_prime_kj: None,
                p_max: None,
                source: "unavailable".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SportInfo;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 28).unwrap()
    }

    fn fitness_day(ctl: f64, atl: f64, ramp: f64) -> WellnessRecord {
        WellnessRecord {
            date: "2024-09-28".to_string(),
            ctl: Some(ctl),
            atl: Some(atl),
            ramp_rate: Some(ramp),
            ..WellnessRecord::default()
        }
    }

    fn event_today() -> EventRecord {
        serde_json::from_str(r#"{"date": "2024-09-28", "category": "WORKOUT"}"#).unwrap()
    }

    #[test]
    fn test_decay_constants() {
        assert!((ctl_decay() - 0.97647).abs() < 1e-5);
        assert!((atl_decay() - 0.86688).abs() < 1e-5);
    }

    #[test]
    fn test_reported_values_used_without_planned_workout() {
        let snap = FitnessSnapshot::resolve(
            today(),
            Some(&fitness_day(60.0, 70.0, 3.0)),
            Some(&fitness_day(50.0, 50.0, 2.0)),
            &[],
            &[],
        );
        assert_eq!(snap.ctl, Some(60.0));
        assert_eq!(snap.tsb, Some(-10.0));
        assert_eq!(snap.fitness_source, SOURCE_REPORTED);
    }

    #[test]
    fn test_decayed_values_when_planned_not_completed() {
        let snap = FitnessSnapshot::resolve(
            today(),
            Some(&fitness_day(60.0, 70.0, 3.0)),
            Some(&fitness_day(50.0, 50.0, 2.0)),
            &[event_today()],
            &[],
        );
        assert_eq!(snap.ctl, Some(48.82));
        assert_eq!(snap.atl, Some(43.34));
        assert_eq!(snap.ramp_rate, Some(1.95));
        assert_eq!(snap.tsb, Some(5.48));
        assert_eq!(snap.fitness_source, SOURCE_DECAYED);
    }

    #[test]
    fn test_missing_today_falls_back_to_decay() {
        let snap =
            FitnessSnapshot::resolve(today(), None, Some(&fitness_day(50.0, 50.0, 2.0)), &[], &[]);
        assert_eq!(snap.ctl, Some(48.82));
        assert_eq!(snap.fitness_source, SOURCE_REPORTED);
    }

    #[test]
    fn test_no_data_is_all_none() {
        let snap = FitnessSnapshot::resolve(today(), None, None, &[], &[]);
        assert_eq!(snap.ctl, None);
        assert_eq!(snap.tsb, None);
    }

    #[test]
    fn test_projection_rises_with_rest() {
        let snap = FitnessSnapshot {
            ctl: Some(60.0),
            atl: Some(70.0),
            ..FitnessSnapshot::default()
        };
        assert_eq!(snap.project_tsb(0), -10.0);
        assert!(snap.project_tsb(5) > 10.0);
    }

    #[test]
    fn test_power_model() {
        let mut day = WellnessRecord::default();
        day.sport_info = vec![
            SportInfo {
                sport_type: "Run".to_string(),
                eftp: Some(4.1),
                w_prime: None,
                p_max: None,
            },
            SportInfo {
                sport_type: "Ride".to_string(),
                eftp: Some(281.37),
                w_prime: Some(18720.0),
                p_max: Some(1050.4),
            },
        ];

        let model = PowerModel::from_wellness(Some(&day));
        assert_eq!(model.eftp, Some(281.4));
        assert_eq!(model.w_prime, Some(18720.0));
        assert_eq!(model.w_prime_kj, Some(18.7));
        assert_eq!(model.p_max, Some(1050.0));
        assert_eq!(model.source, "wellness.sportInfo");

        assert_eq!(PowerModel::from_wellness(None).source, "unavailable");
    }
}
