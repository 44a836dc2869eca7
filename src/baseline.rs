//! Baseline & validity filter
//!
//! HRV readings outside the configured plausible range are sensor error. They
//! stay on the wellness record but are invisible to baselines, the Recovery
//! Index, persistence counts and summaries.

use crate::config::HrvSettings;
use crate::models::WellnessRecord;
use crate::stats::{mean, round_dp};
use serde::{Deserialize, Serialize};

/// Rolling HRV / RHR references for one window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baselines {
    /// Mean of valid HRV readings, 1 dp
    pub hrv: Option<f64>,
    /// Mean of resting HR readings, 1 dp
    pub rhr: Option<f64>,
    pub hrv_points: usize,
    pub rhr_points: usize,
}

pub struct BaselineCalculator {
    hrv: HrvSettings,
}

impl BaselineCalculator {
    pub fn new() -> Self {
        BaselineCalculator {
            hrv: HrvSettings::default(),
        }
    }

    pub fn with_config(hrv: HrvSettings) -> Self {
        BaselineCalculator { hrv }
    }

    pub fn is_valid_hrv(&self, value: Option<f64>) -> bool {
        self.hrv.is_valid(value)
    }

    /// HRV values passing the validity filter, in record order
    pub fn valid_hrv_values(&self, wellness: &[WellnessRecord]) -> Vec<f64> {
        wellness
            .iter()
            .filter_map(|w| w.hrv.filter(|v| self.hrv.is_valid(Some(*v))))
            .collect()
    }

    /// Resting HR values that are present and non-zero
    pub fn rhr_values(&self, wellness: &[WellnessRecord]) -> Vec<f64> {
        wellness
            .iter()
            .filter_map(|w| w.resting_hr.filter(|v| *v != 0.0))
            .collect()
    }

    pub fn baselines(&self, wellness: &[WellnessRecord]) -> Baselines {
        let hrv_values = self.valid_hrv_values(wellness);
        let rhr_values = self.rhr_values(wellness);

        Baselines {
            hrv: mean(&hrv_values).map(|m| round_dp(m, 1)),
            rhr: mean(&rhr_values).map(|m| round_dp(m, 1)),
            hrv_points: hrv_values.len(),
            rhr_points: rhr_values.len(),
        }
    }

    /// HRV of the most recent wellness record, if valid.
    ///
    /// An invalid latest reading does not fall back to an older day.
    pub fn latest_hrv(&self, wellness: &[WellnessRecord]) -> Option<f64> {
        wellness
            .last()
            .and_then(|w| w.hrv)
            .filter(|v| self.hrv.is_valid(Some(*v)))
    }

    pub fn latest_rhr(&self, wellness: &[WellnessRecord]) -> Option<f64> {
        wellness.last().and_then(|w| w.resting_hr).filter(|v| *v != 0.0)
    }

    /// Consecutive days, newest first, with valid HRV below `threshold`.
    /// An invalid or missing reading ends the streak.
    pub fn hrv_low_streak(&self, wellness: &[WellnessRecord], threshold: f64) -> u32 {
        wellness
            .iter()
            .rev()
            .take_while(|w| matches!(w.hrv, Some(v) if self.hrv.is_valid(Some(v)) && v < threshold))
            .count() as u32
    }

    /// Consecutive days, newest first, with resting HR at or above `threshold`
    pub fn rhr_high_streak(&self, wellness: &[WellnessRecord], threshold: f64) -> u32 {
        wellness
            .iter()
            .rev()
            .take_while(|w| matches!(w.resting_hr, Some(v) if v >= threshold))
            .count() as u32
    }
}

impl Default for BaselineCalculator {
    fn default() -> Self {
        Self::new()
    }
}
