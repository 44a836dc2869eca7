//! Derived load and recovery metrics
//!
//! Every metric is `None` when its inputs are missing or would divide by zero,
//! so a reader can never mistake "unknown" for zero load.

use crate::benchmark::{BenchmarkBlock, HistorySpan, Season};
use crate::config::{DurabilitySettings, EngineConfig};
use crate::load::{ZoneDistribution, ZoneTotals};
use crate::models::{ActivityRecord, EventCategory, EventRecord, SportFamily, CONSISTENCY_TYPES};
use crate::phase::Phase;
use crate::stats::{fmt_float, mean, ratio, round_dp, sample_stdev};
use crate::tid::{SeilerTid, TidComparison};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Minimum active days before primary-sport monotony is meaningful
pub const PRIMARY_SPORT_MIN_ACTIVE_DAYS: usize = 3;

/// Monotony above this reads as "elevated"
pub const MONOTONY_ELEVATED: f64 = 2.0;

pub const GREY_ZONE_NOTE: &str = "Gray Zone % (Z3/tempo) - minimize in polarized training";
pub const QUALITY_INTENSITY_NOTE: &str =
    "Quality Intensity % (Z4+/threshold+) - target ~20% in polarized training";
pub const POLARISATION_NOTE: &str = "Easy time (Z1+Z2) / Total - target ~80% in polarized training";
pub const HARD_DAYS_NOTE: &str = "Zone ladder: z3+ >= 30min, z4+ >= 10min, z5+ >= 5min, \
    z6+ >= 2min, z7 >= 1min. Cumulative thresholds, higher zones need less time to qualify as hard";

const DURABILITY_NOTE: &str = "Steady-state power sessions only (VI <= 1.05, VI > 0, \
    >= 90min, power data). Negative decoupling = strong durability. \
    Trend compares 7d vs 28d mean (+/-1% = stable).";

/// Monotony of the sport family carrying the most acute load
#[derive(Debug, Clone, PartialEq)]
pub struct PrimarySport {
    pub family: SportFamily,
    pub total_load: f64,
    pub monotony: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityTrend {
    Improving,
    Stable,
    Declining,
}

/// Aerobic decoupling trend over steady-state long sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Durability {
    pub mean_decoupling_7d: Option<f64>,
    pub mean_decoupling_28d: Option<f64>,
    pub high_drift_count_7d: u32,
    pub high_drift_count_28d: u32,
    pub qualifying_sessions_7d: u32,
    pub qualifying_sessions_28d: u32,
    pub trend: Option<DurabilityTrend>,
    pub note: String,
}

/// How fitness is expressed rather than how much load was done
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub durability: Durability,
    pub tid_comparison: TidComparison,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyDetails {
    pub planned_days: u32,
    pub completed_days: u32,
    pub matched_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_dates: Option<Vec<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_dates: Option<Vec<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub hrv_data_points: usize,
    pub rhr_data_points: usize,
    pub activities_7d: usize,
    pub activities_28d: usize,
    pub planned_workouts_7d: usize,
    pub ftp_history_days: HistorySpan,
}

/// Point-in-time snapshot of every computed metric for one evaluation date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    // Primary readiness
    pub recovery_index: Option<f64>,
    pub hrv_baseline_7d: Option<f64>,
    pub rhr_baseline_7d: Option<f64>,
    pub hrv_baseline_28d: Option<f64>,
    pub rhr_baseline_28d: Option<f64>,
    pub latest_hrv: Option<f64>,
    pub latest_rhr: Option<f64>,

    // Load
    pub acwr: Option<f64>,
    pub acwr_interpretation: Option<String>,
    pub monotony: Option<f64>,
    pub monotony_interpretation: Option<String>,
    pub primary_sport: Option<SportFamily>,
    pub primary_sport_monotony: Option<f64>,
    pub primary_sport_tss_7d: Option<f64>,
    pub effective_monotony: Option<f64>,
    pub multi_sport_detected: bool,
    pub strain: Option<f64>,
    pub stress_tolerance: Option<f64>,
    pub load_recovery_ratio: Option<f64>,
    pub tss_7d_total: f64,
    pub tss_28d_total: f64,

    // Zone distribution
    pub zone_distribution_7d: ZoneDistribution,
    pub grey_zone_percentage: Option<f64>,
    pub grey_zone_note: String,
    pub quality_intensity_percentage: Option<f64>,
    pub quality_intensity_note: String,
    pub polarisation_index: Option<f64>,
    pub polarisation_note: String,
    pub hard_days_this_week: u32,
    pub hard_days_note: String,

    // Seiler TID
    pub seiler_tid_7d: SeilerTid,
    pub seiler_tid_7d_primary: Option<SeilerTid>,
    pub seiler_tid_28d: SeilerTid,
    pub seiler_tid_28d_primary: Option<SeilerTid>,

    pub capability: Capability,

    pub consistency_index: Option<f64>,
    pub consistency_details: ConsistencyDetails,

    pub phase_detected: Phase,
    pub phase_triggers: Vec<String>,
    pub seasonal_context: Season,

    pub benchmark_indoor: BenchmarkBlock,
    pub benchmark_outdoor: BenchmarkBlock,

    // Power model
    pub eftp: Option<f64>,
    pub w_prime: Option<f64>,
    pub w_prime_kj: Option<f64>,
    pub p_max: Option<f64>,
    pub power_model_source: String,

    pub vo2max: Option<f64>,

    pub calculation_timestamp: String,
    pub data_quality: DataQuality,
}

/// Computes the scalar load / recovery metrics
pub struct MetricCalculator {
    durability: DurabilitySettings,
}

impl MetricCalculator {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        MetricCalculator {
            durability: config.durability.clone(),
        }
    }

    /// Acute:chronic workload ratio of two dense daily series (2 dp)
    pub fn acwr(&self, acute: &[f64], chronic: &[f64]) -> Option<f64> {
        let chronic_mean = mean(chronic).filter(|m| *m > 0.0)?;
        let acute_mean = mean(acute).unwrap_or(0.0);
        ratio(acute_mean, chronic_mean).map(|r| round_dp(r, 2))
    }

    /// Foster monotony, mean / sample stdev (2 dp).
    ///
    /// `None` for an all-zero week or when every day carries the same load.
    pub fn monotony(&self, daily: &[f64]) -> Option<f64> {
        if daily.len() < 2 || daily.iter().all(|d| *d == 0.0) {
            return None;
        }
        let stdev = sample_stdev(daily).filter(|sd| *sd > 0.0)?;
        mean(daily).map(|m| round_dp(m / stdev, 2))
    }

    /// Family with the highest acute load. Ties go to the first family in
    /// table order.
    pub fn primary_sport(&self, by_family: &BTreeMap<SportFamily, Vec<f64>>) -> Option<PrimarySport> {
        let (family, series, total) = by_family
            .iter()
            .map(|(family, series)| (*family, series, series.iter().sum::<f64>()))
            .fold(None::<(SportFamily, &Vec<f64>, f64)>, |best, cur| match best {
                Some(b) if b.2 >= cur.2 => Some(b),
                _ => Some(cur),
            })?;

        let active_days = series.iter().filter(|d| **d > 0.0).count();
        let monotony = if active_days >= PRIMARY_SPORT_MIN_ACTIVE_DAYS {
            self.monotony(series)
        } else {
            None
        };

        tracing::debug!(
            primary_sport = %family,
            load = total,
            ?monotony,
            "Primary sport"
        );

        Some(PrimarySport {
            family,
            total_load: round_dp(total, 0),
            monotony,
        })
    }

    /// Monotony used for alerting: the primary-sport value when several
    /// families are active and it reads lower than the total
    pub fn effective_monotony(
        &self,
        total: Option<f64>,
        primary: Option<f64>,
        multi_sport: bool,
    ) -> Option<f64> {
        match (total, primary) {
            (Some(t), Some(p)) if multi_sport && p < t => Some(p),
            (None, Some(p)) if multi_sport => Some(p),
            _ => total,
        }
    }

    /// Acute load × monotony (whole number)
    pub fn strain(&self, acute_load: f64, monotony: Option<f64>) -> Option<f64> {
        monotony
            .filter(|m| *m != 0.0)
            .map(|m| round_dp(acute_load * m, 0))
    }

    /// (HRV / HRV baseline) / (RHR / RHR baseline), 2 dp
    pub fn recovery_index(
        &self,
        latest_hrv: Option<f64>,
        hrv_baseline: Option<f64>,
        latest_rhr: Option<f64>,
        rhr_baseline: Option<f64>,
    ) -> Option<f64> {
        let hrv_ratio = ratio(latest_hrv?, hrv_baseline?)?;
        let rhr_ratio = ratio(latest_rhr?, rhr_baseline?).filter(|r| *r > 0.0)?;
        ratio(hrv_ratio, rhr_ratio).map(|ri| round_dp(ri, 2))
    }

    /// (strain / monotony) / 100, 1 dp
    pub fn stress_tolerance(&self, strain: Option<f64>, monotony: Option<f64>) -> Option<f64> {
        let strain = strain.filter(|s| *s != 0.0)?;
        ratio(strain, monotony?).map(|v| round_dp(v / 100.0, 1))
    }

    /// Acute load / (RI × 100), 1 dp
    pub fn load_recovery_ratio(&self, acute_load: f64, recovery_index: Option<f64>) -> Option<f64> {
        let ri = recovery_index.filter(|ri| *ri > 0.0)?;
        ratio(acute_load, ri * 100.0).map(|v| round_dp(v, 1))
    }

    /// Z3 share of zone time in percent (1 dp)
    pub fn grey_zone_percentage(&self, zones: &ZoneTotals) -> Option<f64> {
        ratio(zones.seconds[2], zones.total()).map(|r| round_dp(r * 100.0, 1))
    }

    /// Z4+ share of zone time in percent (1 dp)
    pub fn quality_intensity_percentage(&self, zones: &ZoneTotals) -> Option<f64> {
        ratio(zones.z4_plus(), zones.total()).map(|r| round_dp(r * 100.0, 1))
    }

    /// Legacy polarisation index, (Z1 + Z2) / total (2 dp)
    pub fn polarisation_index(&self, zones: &ZoneTotals) -> Option<f64> {
        ratio(zones.seconds[0] + zones.seconds[1], zones.total()).map(|r| round_dp(r, 2))
    }

    /// Decoupling values of steady-state sessions long enough to show drift
    fn qualifying_decoupling(&self, activities: &[ActivityRecord]) -> Vec<f64> {
        let settings = &self.durability;
        activities
            .iter()
            .filter(|a| {
                matches!(a.variability_index, Some(vi) if vi > 0.0 && vi <= settings.max_variability_index)
                    && a.moving_seconds() >= settings.min_moving_seconds
            })
            .filter_map(|a| a.decoupling)
            .collect()
    }

    pub fn durability(&self, acute: &[ActivityRecord], chronic: &[ActivityRecord]) -> Durability {
        let settings = &self.durability;
        let vals_7d = self.qualifying_decoupling(acute);
        let vals_28d = self.qualifying_decoupling(chronic);

        let window_mean = |vals: &[f64]| {
            if vals.len() >= settings.min_sessions {
                mean(vals).map(|m| round_dp(m, 2))
            } else {
                None
            }
        };
        let high_drift = |vals: &[f64]| vals.iter().filter(|v| **v > settings.high_drift_pct).count() as u32;

        let mean_7d = window_mean(&vals_7d);
        let mean_28d = window_mean(&vals_28d);

        let trend = match (mean_7d, mean_28d) {
            (Some(a), Some(c)) => {
                let delta = a - c;
                Some(if delta < -settings.trend_band {
                    DurabilityTrend::Improving
                } else if delta > settings.trend_band {
                    DurabilityTrend::Declining
                } else {
                    DurabilityTrend::Stable
                })
            }
            _ => None,
        };

        tracing::debug!(
            ?mean_7d,
            sessions_7d = vals_7d.len(),
            ?mean_28d,
            sessions_28d = vals_28d.len(),
            ?trend,
            "Durability"
        );

        Durability {
            mean_decoupling_7d: mean_7d,
            mean_decoupling_28d: mean_28d,
            high_drift_count_7d: high_drift(&vals_7d),
            high_drift_count_28d: high_drift(&vals_28d),
            qualifying_sessions_7d: vals_7d.len() as u32,
            qualifying_sessions_28d: vals_28d.len() as u32,
            trend,
            note: DURABILITY_NOTE.to_string(),
        }
    }

    /// Share of planned workout days that also have a completed session of
    /// the comparison family (2 dp)
    pub fn consistency(
        &self,
        activities: &[ActivityRecord],
        past_events: &[EventRecord],
    ) -> (Option<f64>, ConsistencyDetails) {
        let planned: BTreeSet<NaiveDate> = past_events
            .iter()
            .filter(|e| e.category == EventCategory::Workout)
            .filter_map(|e| e.day())
            .collect();
        let completed: BTreeSet<NaiveDate> = activities
            .iter()
            .filter(|a| CONSISTENCY_TYPES.contains(&a.activity_type.as_str()))
            .filter_map(|a| a.day())
            .collect();
        let matched = planned.intersection(&completed).count();

        if planned.is_empty() {
            return (
                None,
                ConsistencyDetails {
                    planned_days: 0,
                    completed_days: completed.len() as u32,
                    matched_days: 0,
                    note: Some("No planned workouts in period".to_string()),
                    ..ConsistencyDetails::default()
                },
            );
        }

        let index = round_dp(matched as f64 / planned.len() as f64, 2);
        (
            Some(index),
            ConsistencyDetails {
                planned_days: planned.len() as u32,
                completed_days: completed.len() as u32,
                matched_days: matched as u32,
                planned_dates: Some(planned.into_iter().collect()),
                completed_dates: Some(completed.into_iter().collect()),
                note: None,
            },
        )
    }
}

impl Default for MetricCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Gabbett reading of the acute:chronic ratio
pub fn interpret_acwr(acwr: Option<f64>) -> Option<String> {
    let acwr = acwr?;
    let label = if acwr < 0.8 {
        "undertraining"
    } else if acwr <= 1.3 {
        "optimal"
    } else if acwr <= 1.5 {
        "caution"
    } else {
        "danger"
    };
    Some(label.to_string())
}

/// Monotony reading, calling out multi-sport inflation of the total
pub fn interpret_monotony(total: Option<f64>, effective: Option<f64>, multi_sport: bool) -> Option<String> {
    let effective = effective?;
    let level = if effective > MONOTONY_ELEVATED {
        "elevated"
    } else {
        "normal"
    };

    match total {
        Some(t) if multi_sport && effective < t => Some(format!(
            "{} (primary sport {}, total {} inflated by multi-sport)",
            level,
            fmt_float(effective),
            fmt_float(t)
        )),
        _ => Some(level.to_string()),
    }
}
