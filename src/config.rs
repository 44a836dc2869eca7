//! Engine configuration
//!
//! Every tuned threshold the engine uses lives here so it can be reviewed and
//! overridden from a TOML file instead of being buried in the calculators.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrainLoadError};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub windows: WindowSettings,
    pub hrv: HrvSettings,
    pub alerts: AlertThresholds,
    pub phase: PhaseThresholds,
    pub durability: DurabilitySettings,
    pub race: RaceSettings,
}

/// Rolling window lengths in days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Acute window (ACWR numerator, monotony, 7d TID)
    pub acute_days: u32,
    /// Chronic window (ACWR denominator, 28d baselines and TID)
    pub chronic_days: u32,
    /// How far ahead races are listed on the calendar
    pub race_horizon_days: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            acute_days: 7,
            chronic_days: 28,
            race_horizon_days: 90,
        }
    }
}

/// Plausible RMSSD range; readings outside are sensor error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrvSettings {
    pub min_valid_ms: f64,
    pub max_valid_ms: f64,
}

impl Default for HrvSettings {
    fn default() -> Self {
        Self {
            min_valid_ms: 10.0,
            max_valid_ms: 250.0,
        }
    }
}

impl HrvSettings {
    pub fn is_valid(&self, value: Option<f64>) -> bool {
        matches!(value, Some(v) if v >= self.min_valid_ms && v <= self.max_valid_ms)
    }
}

/// Graduated alert thresholds (warning before alarm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub acwr_warning_low: f64,
    pub acwr_warning_high: f64,
    pub acwr_alarm_low: f64,
    pub acwr_alarm_high: f64,
    pub monotony_warning: f64,
    pub monotony_alarm: f64,
    pub strain_alarm: f64,
    pub recovery_index_warning: f64,
    pub recovery_index_alarm: f64,
    /// HRV drop below the 7d baseline, in percent
    pub hrv_drop_pct: f64,
    /// RHR rise above the 7d baseline, in bpm
    pub rhr_rise_bpm: f64,
    /// Persistence strictly above this many days escalates to alarm
    pub persistence_escalation_days: u32,
    /// 7d load this far (percent) below the 28d weekly average is a deload
    pub deload_deficit_pct: f64,
    pub durability_mean_alarm: f64,
    pub durability_delta_warning: f64,
    pub durability_high_drift_sessions: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            acwr_warning_low: 0.8,
            acwr_warning_high: 1.3,
            acwr_alarm_low: 0.75,
            acwr_alarm_high: 1.35,
            monotony_warning: 2.3,
            monotony_alarm: 2.5,
            strain_alarm: 3500.0,
            recovery_index_warning: 0.7,
            recovery_index_alarm: 0.6,
            hrv_drop_pct: 20.0,
            rhr_rise_bpm: 5.0,
            persistence_escalation_days: 2,
            deload_deficit_pct: 20.0,
            durability_mean_alarm: 5.0,
            durability_delta_warning: 2.0,
            durability_high_drift_sessions: 3,
        }
    }
}

/// Phase cascade thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseThresholds {
    pub acwr_low: f64,
    pub acwr_mid: f64,
    pub acwr_high: f64,
    pub strain_high: f64,
    pub monotony_high: f64,
    pub recovery_index_low: f64,
    pub tsb_recovery: f64,
    pub quality_build_min_pct: f64,
    pub quality_build_max_pct: f64,
    pub quality_peak_pct: f64,
    pub hard_days_build: u32,
    pub hard_days_peak: u32,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            acwr_low: 0.8,
            acwr_mid: 1.0,
            acwr_high: 1.3,
            strain_high: 3500.0,
            monotony_high: 2.5,
            recovery_index_low: 0.6,
            tsb_recovery: 10.0,
            quality_build_min_pct: 15.0,
            quality_build_max_pct: 25.0,
            quality_peak_pct: 20.0,
            hard_days_build: 2,
            hard_days_peak: 3,
        }
    }
}

/// Which sessions count toward the decoupling trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurabilitySettings {
    pub max_variability_index: f64,
    pub min_moving_seconds: f64,
    pub min_sessions: usize,
    /// Decoupling above this percentage is "high drift"
    pub high_drift_pct: f64,
    /// 7d vs 28d mean difference that counts as a trend, in points
    pub trend_band: f64,
}

impl Default for DurabilitySettings {
    fn default() -> Self {
        Self {
            max_variability_index: 1.05,
            min_moving_seconds: 5400.0,
            min_sessions: 2,
            high_drift_pct: 5.0,
            trend_band: 1.0,
        }
    }
}

/// Race calendar activation windows, in days before the event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    pub taper_window_min_days: i64,
    pub taper_window_max_days: i64,
    pub race_week_days: i64,
    /// Short-shortfall band below the TSB target minimum before wording escalates
    pub tsb_shortfall_band: f64,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            taper_window_min_days: 8,
            taper_window_max_days: 14,
            race_week_days: 7,
            tsb_shortfall_band: 10.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TrainLoadError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    /// Parse configuration from TOML text; missing keys take defaults
    pub fn load_from_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trainload")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %e,
                    "Using default engine configuration"
                );
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let w = &self.windows;
        if w.acute_days == 0 || w.chronic_days < w.acute_days {
            return Err(TrainLoadError::Configuration(format!(
                "acute window ({}) must be non-zero and not longer than chronic window ({})",
                w.acute_days, w.chronic_days
            )));
        }
        if self.hrv.min_valid_ms >= self.hrv.max_valid_ms {
            return Err(TrainLoadError::Configuration(
                "hrv.min_valid_ms must be below hrv.max_valid_ms".to_string(),
            ));
        }
        let r = &self.race;
        if r.taper_window_min_days > r.taper_window_max_days {
            return Err(TrainLoadError::Configuration(
                "race taper window is inverted".to_string(),
            ));
        }
        Ok(())
    }
}
