//! Graduated alerts
//!
//! Alerts are re-evaluated from scratch on every run. Each metric emits at
//! most one threshold alert (warning before alarm). The final list is ordered
//! by priority tier first and severity second.

use crate::baseline::BaselineCalculator;
use crate::config::{AlertThresholds, EngineConfig};
use crate::metrics::{DerivedMetrics, DurabilityTrend};
use crate::models::WellnessRecord;
use crate::stats::{fmt_float, ratio, round_dp, round_whole};
use crate::tid::TidDrift;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Alarm,
}

impl Severity {
    /// Sort rank, most urgent first
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Alarm => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Alarm => "alarm",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert value or threshold: integer count or limit, measured number, or a
/// descriptive label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertValue {
    Integer(i64),
    Number(f64),
    Label(String),
}

impl AlertValue {
    /// Configured limit, serialized as an integer when it has no fraction
    pub fn limit(value: f64) -> Self {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            AlertValue::Integer(value as i64)
        } else {
            AlertValue::Number(value)
        }
    }
}

impl From<f64> for AlertValue {
    fn from(value: f64) -> Self {
        AlertValue::Number(value)
    }
}

impl From<u32> for AlertValue {
    fn from(value: u32) -> Self {
        AlertValue::Integer(i64::from(value))
    }
}

impl From<i64> for AlertValue {
    fn from(value: i64) -> Self {
        AlertValue::Integer(value)
    }
}

impl From<String> for AlertValue {
    fn from(value: String) -> Self {
        AlertValue::Label(value)
    }
}

impl From<&str> for AlertValue {
    fn from(value: &str) -> Self {
        AlertValue::Label(value.to_string())
    }
}

impl fmt::Display for AlertValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertValue::Integer(n) => write!(f, "{}", n),
            AlertValue::Number(n) => write!(f, "{}", fmt_float(*n)),
            AlertValue::Label(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub metric: String,
    pub value: Option<AlertValue>,
    pub severity: Severity,
    pub threshold: AlertValue,
    pub context: String,
    pub persistence_days: Option<u32>,
    /// Priority tier, 1 most important
    pub tier: u8,
}

impl Alert {
    pub fn new(
        metric: &str,
        value: Option<AlertValue>,
        severity: Severity,
        threshold: impl Into<AlertValue>,
        context: String,
        tier: u8,
    ) -> Self {
        Alert {
            metric: metric.to_string(),
            value,
            severity,
            threshold: threshold.into(),
            context,
            persistence_days: None,
            tier,
        }
    }

    pub fn with_persistence(mut self, days: u32) -> Self {
        self.persistence_days = Some(days);
        self
    }
}

/// Order by tier, then severity; stable for equal keys
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by_key(|a| (a.tier, a.severity.rank()));
}

pub struct AlertEngine {
    thresholds: AlertThresholds,
    baselines: BaselineCalculator,
    /// Number of acute windows in the chronic window (4 for 7/28)
    chronic_weeks: f64,
    /// Session decoupling counted as high drift, percent
    high_drift_pct: f64,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        AlertEngine {
            thresholds: config.alerts.clone(),
            baselines: BaselineCalculator::with_config(config.hrv.clone()),
            chronic_weeks: config.windows.chronic_days as f64 / config.windows.acute_days as f64,
            high_drift_pct: config.durability.high_drift_pct,
        }
    }

    /// Evaluate every metric alert for one snapshot, sorted
    pub fn evaluate(&self, metrics: &DerivedMetrics, wellness_7d: &[WellnessRecord]) -> Vec<Alert> {
        let mut alerts = Vec::new();

        alerts.extend(self.acwr_alert(metrics.acwr));
        alerts.extend(self.monotony_alert(metrics));
        alerts.extend(self.strain_alert(metrics.strain));
        alerts.extend(self.recovery_index_alert(metrics.recovery_index));
        alerts.extend(self.hrv_alert(metrics.latest_hrv, metrics.hrv_baseline_7d, wellness_7d));
        alerts.extend(self.rhr_alert(metrics.latest_rhr, metrics.rhr_baseline_7d, wellness_7d));
        alerts.extend(self.durability_alerts(metrics));
        alerts.extend(self.tid_alert(metrics));

        sort_alerts(&mut alerts);
        alerts
    }

    /// Context string when acute load sits at least the deficit threshold
    /// below the chronic weekly average
    pub fn deload_context(&self, acute_load: f64, chronic_load: f64) -> Option<String> {
        if chronic_load == 0.0 || self.chronic_weeks <= 0.0 {
            return None;
        }
        let weekly_avg = chronic_load / self.chronic_weeks;
        let deficit_pct = ratio(weekly_avg - acute_load, weekly_avg)? * 100.0;

        (deficit_pct >= self.thresholds.deload_deficit_pct).then(|| {
            format!(
                "deload pattern detected (7-day TSS {} is {}% below 28-day weekly avg {})",
                round_whole(acute_load),
                round_whole(deficit_pct),
                round_whole(weekly_avg)
            )
        })
    }

    fn acwr_alert(&self, acwr: Option<f64>) -> Option<Alert> {
        let acwr = acwr?;
        let t = &self.thresholds;

        if acwr <= t.acwr_alarm_low || acwr >= t.acwr_alarm_high {
            Some(Alert::new(
                "acwr",
                Some(acwr.into()),
                Severity::Alarm,
                format!("{} / {}", fmt_float(t.acwr_alarm_low), fmt_float(t.acwr_alarm_high)),
                format!(
                    "ACWR {} outside safe range. Injury/overreach risk elevated.",
                    fmt_float(acwr)
                ),
                2,
            ))
        } else if acwr <= t.acwr_warning_low || acwr >= t.acwr_warning_high {
            Some(Alert::new(
                "acwr",
                Some(acwr.into()),
                Severity::Warning,
                format!("{} / {}", fmt_float(t.acwr_warning_low), fmt_float(t.acwr_warning_high)),
                format!(
                    "ACWR {} at edge of optimal range. Monitor closely. Alarm at {}/{}.",
                    fmt_float(acwr),
                    fmt_float(t.acwr_alarm_low),
                    fmt_float(t.acwr_alarm_high)
                ),
                2,
            ))
        } else {
            None
        }
    }

    fn monotony_alert(&self, m: &DerivedMetrics) -> Option<Alert> {
        let effective = m.effective_monotony?;
        let t = &self.thresholds;

        let multi_sport_note = match (m.primary_sport, m.primary_sport_monotony, m.monotony) {
            (Some(sport), Some(primary), Some(total)) if m.multi_sport_detected && primary < total => format!(
                " (total monotony {} inflated by multi-sport training; {} monotony {} used for alerting)",
                fmt_float(total),
                sport,
                fmt_float(primary)
            ),
            _ => String::new(),
        };
        let deload = self.deload_context(m.tss_7d_total, m.tss_28d_total);
        let (value, alarm_at) = (fmt_float(effective), fmt_float(t.monotony_alarm));

        let alert = if effective >= t.monotony_alarm {
            match &deload {
                Some(context) => Alert::new(
                    "monotony",
                    Some(effective.into()),
                    Severity::Info,
                    t.monotony_alarm,
                    format!(
                        "Monotony {} ≥ {} but {}. Structural artifact, not overuse risk. \
                         Will normalize as 7-day window rolls forward.{}",
                        value, alarm_at, context, multi_sport_note
                    ),
                    2,
                ),
                None => Alert::new(
                    "monotony",
                    Some(effective.into()),
                    Severity::Alarm,
                    t.monotony_alarm,
                    format!(
                        "Monotony {} ≥ {}. Overuse risk elevated. Vary training load.{}",
                        value, alarm_at, multi_sport_note
                    ),
                    2,
                ),
            }
        } else if effective >= t.monotony_warning {
            match &deload {
                Some(context) => Alert::new(
                    "monotony",
                    Some(effective.into()),
                    Severity::Info,
                    t.monotony_warning,
                    format!(
                        "Monotony {} approaching threshold but {}. Expected, not actionable.{}",
                        value, context, multi_sport_note
                    ),
                    2,
                ),
                None => Alert::new(
                    "monotony",
                    Some(effective.into()),
                    Severity::Warning,
                    t.monotony_warning,
                    format!(
                        "Monotony {} approaching overuse threshold. Alarm at {}.{}",
                        value, alarm_at, multi_sport_note
                    ),
                    2,
                ),
            }
        } else {
            return None;
        };

        if deload.is_some() {
            tracing::debug!(effective, "Monotony alert suppressed to info by deload");
        }
        Some(alert)
    }

    fn strain_alert(&self, strain: Option<f64>) -> Option<Alert> {
        let limit = self.thresholds.strain_alarm;
        let strain = strain.filter(|s| *s > limit)?;
        Some(Alert::new(
            "strain",
            Some(strain.into()),
            Severity::Alarm,
            AlertValue::limit(limit),
            format!(
                "Strain {} > {}. High cumulative stress. Consider load reduction.",
                fmt_float(strain),
                AlertValue::limit(limit)
            ),
            2,
        ))
    }

    fn recovery_index_alert(&self, ri: Option<f64>) -> Option<Alert> {
        let ri = ri?;
        let t = &self.thresholds;

        if ri < t.recovery_index_alarm {
            Some(Alert::new(
                "recovery_index",
                Some(ri.into()),
                Severity::Alarm,
                t.recovery_index_alarm,
                format!(
                    "RI {} < {}. Immediate deload required.",
                    fmt_float(ri),
                    fmt_float(t.recovery_index_alarm)
                ),
                1,
            ))
        } else if ri < t.recovery_index_warning {
            Some(Alert::new(
                "recovery_index",
                Some(ri.into()),
                Severity::Warning,
                t.recovery_index_warning,
                format!(
                    "RI {} < {}. Monitor — if persists >3 days, deload review required.",
                    fmt_float(ri),
                    fmt_float(t.recovery_index_warning)
                ),
                1,
            ))
        } else {
            None
        }
    }

    fn escalated(&self, persistence: u32) -> bool {
        persistence > self.thresholds.persistence_escalation_days
    }

    fn hrv_alert(&self, latest: Option<f64>, baseline: Option<f64>, wellness_7d: &[WellnessRecord]) -> Option<Alert> {
        let latest = latest.filter(|v| *v != 0.0)?;
        let baseline = baseline.filter(|b| *b > 0.0)?;
        let drop = self.thresholds.hrv_drop_pct;

        let change_pct = (latest - baseline) / baseline * 100.0;
        if change_pct > -drop {
            return None;
        }

        let days = self
            .baselines
            .hrv_low_streak(wellness_7d, baseline * (1.0 - drop / 100.0));
        let value = round_dp(latest, 1);
        let threshold = format!("↓>{}% vs baseline ({})", drop, fmt_float(round_dp(baseline, 1)));
        let below = fmt_float(round_dp(change_pct.abs(), 1));

        let alert = if self.escalated(days) {
            Alert::new(
                "hrv",
                Some(value.into()),
                Severity::Alarm,
                threshold,
                format!(
                    "HRV {} is {}% below baseline, persisting {} days.",
                    fmt_float(value), below, days
                ),
                1,
            )
        } else {
            Alert::new(
                "hrv",
                Some(value.into()),
                Severity::Warning,
                threshold,
                format!(
                    "HRV {} is {}% below baseline. Monitor — alarm if persists >{} days.",
                    fmt_float(value), below, self.thresholds.persistence_escalation_days
                ),
                1,
            )
        };
        Some(alert.with_persistence(days))
    }

    fn rhr_alert(&self, latest: Option<f64>, baseline: Option<f64>, wellness_7d: &[WellnessRecord]) -> Option<Alert> {
        let latest = latest.filter(|v| *v != 0.0)?;
        let baseline = baseline.filter(|b| *b > 0.0)?;
        let rise = self.thresholds.rhr_rise_bpm;

        let change = latest - baseline;
        if change < rise {
            return None;
        }

        let days = self.baselines.rhr_high_streak(wellness_7d, baseline + rise);
        let value = round_dp(latest, 1);
        let threshold = format!("↑≥{}bpm vs baseline ({})", rise, fmt_float(round_dp(baseline, 1)));
        let above = fmt_float(round_dp(change, 1));

        let alert = if self.escalated(days) {
            Alert::new(
                "rhr",
                Some(value.into()),
                Severity::Alarm,
                threshold,
                format!(
                    "RHR {} is {}bpm above baseline, persisting {} days.",
                    fmt_float(value), above, days
                ),
                1,
            )
        } else {
            Alert::new(
                "rhr",
                Some(value.into()),
                Severity::Warning,
                threshold,
                format!(
                    "RHR {} is {}bpm above baseline. Monitor — alarm if persists >{} days.",
                    fmt_float(value), above, self.thresholds.persistence_escalation_days
                ),
                1,
            )
        };
        Some(alert.with_persistence(days))
    }

    fn durability_alerts(&self, m: &DerivedMetrics) -> Vec<Alert> {
        let d = &m.capability.durability;
        let t = &self.thresholds;
        let mut alerts = Vec::new();

        match (d.mean_decoupling_7d, d.mean_decoupling_28d) {
            (_, Some(mean_28d)) if mean_28d > t.durability_mean_alarm => {
                alerts.push(Alert::new(
                    "durability",
                    Some(mean_28d.into()),
                    Severity::Alarm,
                    format!("28d mean > {}%", t.durability_mean_alarm),
                    format!(
                        "Sustained high decoupling ({}% 28d mean). Aerobic efficiency concern — \
                         review volume and recovery.",
                        fmt_float(mean_28d)
                    ),
                    3,
                ));
            }
            (Some(mean_7d), Some(mean_28d))
                if d.trend == Some(DurabilityTrend::Declining)
                    && mean_7d - mean_28d > t.durability_delta_warning =>
            {
                alerts.push(Alert::new(
                    "durability",
                    Some(mean_7d.into()),
                    Severity::Warning,
                    format!("7d > 28d by > {}%", t.durability_delta_warning),
                    format!(
                        "Durability declining: 7d mean decoupling {}% vs 28d {}%. \
                         Check fatigue and recovery.",
                        fmt_float(mean_7d),
                        fmt_float(mean_28d)
                    ),
                    3,
                ));
            }
            _ => {}
        }

        if d.high_drift_count_7d >= t.durability_high_drift_sessions {
            alerts.push(Alert::new(
                "durability",
                Some(d.high_drift_count_7d.into()),
                Severity::Warning,
                format!(
                    ">= {} sessions with >{}% decoupling in 7d",
                    t.durability_high_drift_sessions, self.high_drift_pct
                ),
                format!(
                    "Repeated poor durability: {} sessions with >{}% decoupling in last 7 days.",
                    d.high_drift_count_7d, self.high_drift_pct
                ),
                3,
            ));
        }

        alerts
    }

    fn tid_alert(&self, m: &DerivedMetrics) -> Option<Alert> {
        let cmp = &m.capability.tid_comparison;

        match cmp.drift? {
            TidDrift::AcuteDepolarization => Some(Alert::new(
                "tid_distribution",
                cmp.pi_7d.map(AlertValue::from),
                Severity::Warning,
                "7d PI < 2.0, 28d PI >= 2.0",
                format!(
                    "Acute depolarization: 7d PI {} vs 28d PI {}. Grey zone or threshold work \
                     displacing polarized structure.",
                    display_opt(cmp.pi_7d.map(fmt_float)),
                    display_opt(cmp.pi_28d.map(fmt_float))
                ),
                3,
            )),
            TidDrift::Shifting => Some(Alert::new(
                "tid_distribution",
                cmp.classification_7d.map(|c| AlertValue::from(c.as_str())),
                Severity::Warning,
                "7d/28d classification mismatch",
                format!(
                    "TID shift: 7d {} vs 28d {}. Training distribution changing.",
                    display_opt(cmp.classification_7d),
                    display_opt(cmp.classification_28d)
                ),
                3,
            )),
            TidDrift::Consistent => None,
        }
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn display_opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::ThresholdHistory;
    use crate::engine::ReadinessEngine;
    use crate::models::{SportFamily, TrainingSnapshot};
    use crate::tid::TidClass;
    use chrono::NaiveDate;

    /// Metrics of an empty snapshot, which raise no alerts on their own
    fn quiet_metrics() -> DerivedMetrics {
        let as_of = NaiveDate::from_ymd_opt(2024, 9, 28)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        ReadinessEngine::new()
            .run(&TrainingSnapshot::default(), ThresholdHistory::default(), as_of)
            .derived_metrics
    }

    fn durability(mean_7d: Option<f64>, mean_28d: Option<f64>, trend: Option<DurabilityTrend>) -> DerivedMetrics {
        let mut m = quiet_metrics();
        let d = &mut m.capability.durability;
        d.mean_decoupling_7d = mean_7d;
        d.mean_decoupling_28d = mean_28d;
        d.trend = trend;
        m
    }

    fn alert(tier: u8, severity: Severity) -> Alert {
        Alert::new("test", None, severity, "n/a", String::new(), tier)
    }

    fn day(hrv: Option<f64>, rhr: Option<f64>) -> WellnessRecord {
        WellnessRecord {
            date: "2024-09-28".to_string(),
            hrv,
            resting_hr: rhr,
            ..WellnessRecord::default()
        }
    }

    #[test]
    fn test_tier_dominates_severity() {
        let mut alerts = vec![
            alert(2, Severity::Alarm),
            alert(1, Severity::Info),
            alert(1, Severity::Warning),
            alert(3, Severity::Alarm),
        ];
        sort_alerts(&mut alerts);

        let order: Vec<(u8, Severity)> = alerts.iter().map(|a| (a.tier, a.severity)).collect();
        assert_eq!(
            order,
            vec![
                (1, Severity::Warning),
                (1, Severity::Info),
                (2, Severity::Alarm),
                (3, Severity::Alarm),
            ]
        );
    }

    #[test]
    fn test_acwr_graduation() {
        let engine = AlertEngine::new();
        assert_eq!(engine.acwr_alert(Some(1.0)), None);
        assert_eq!(engine.acwr_alert(Some(1.3)).unwrap().severity, Severity::Warning);
        assert_eq!(engine.acwr_alert(Some(0.8)).unwrap().severity, Severity::Warning);
        let alarm = engine.acwr_alert(Some(1.4)).unwrap();
        assert_eq!(alarm.severity, Severity::Alarm);
        assert_eq!(alarm.threshold, AlertValue::Label("0.75 / 1.35".to_string()));
        assert_eq!(alarm.tier, 2);
    }

    #[test]
    fn test_recovery_index_and_strain() {
        let engine = AlertEngine::new();
        assert_eq!(engine.recovery_index_alert(Some(0.55)).unwrap().severity, Severity::Alarm);
        assert_eq!(engine.recovery_index_alert(Some(0.65)).unwrap().severity, Severity::Warning);
        assert_eq!(engine.recovery_index_alert(Some(0.95)), None);
        assert!(engine.strain_alert(Some(3500.0)).is_none());
        assert!(engine.strain_alert(Some(3501.0)).is_some());
    }

    #[test]
    fn test_deload_context() {
        let engine = AlertEngine::new();
        // weekly average 400, acute 240: 40% deficit
        let context = engine.deload_context(240.0, 1600.0).unwrap();
        assert!(context.contains("40% below"));
        assert!(engine.deload_context(380.0, 1600.0).is_none());
        assert!(engine.deload_context(0.0, 0.0).is_none());
    }

    #[test]
    fn test_hrv_persistence_escalates() {
        let engine = AlertEngine::new();
        let week = vec![
            day(Some(60.0), None),
            day(Some(40.0), None),
            day(Some(41.0), None),
            day(Some(42.0), None),
        ];
        // baseline 60 → threshold 48
        let alert = engine.hrv_alert(Some(42.0), Some(60.0), &week).unwrap();
        assert_eq!(alert.severity, Severity::Alarm);
        assert_eq!(alert.persistence_days, Some(3));

        let short = vec![day(Some(60.0), None), day(Some(60.0), None), day(Some(42.0), None)];
        let alert = engine.hrv_alert(Some(42.0), Some(60.0), &short).unwrap();
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.persistence_days, Some(1));

        assert!(engine.hrv_alert(Some(55.0), Some(60.0), &short).is_none());
    }

    #[test]
    fn test_invalid_hrv_breaks_persistence() {
        let engine = AlertEngine::new();
        let week = vec![
            day(Some(40.0), None),
            day(Some(40.0), None),
            day(Some(255.0), None),
            day(Some(42.0), None),
        ];
        let alert = engine.hrv_alert(Some(42.0), Some(60.0), &week).unwrap();
        assert_eq!(alert.persistence_days, Some(1));
        assert_eq!(alert.severity, Severity::Warning);
    }

    #[test]
    fn test_rhr_alert() {
        let engine = AlertEngine::new();
        let week = vec![day(None, Some(48.0)), day(None, Some(54.0)), day(None, Some(55.0))];
        let alert = engine.rhr_alert(Some(55.0), Some(49.0), &week).unwrap();
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.persistence_days, Some(2));
        assert!(engine.rhr_alert(Some(52.0), Some(49.0), &week).is_none());
    }

    #[test]
    fn test_alert_value_serialization() {
        let a = Alert::new("acwr", Some(1.4.into()), Severity::Alarm, "0.75 / 1.35", String::new(), 2);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["value"], 1.4);
        assert_eq!(json["severity"], "alarm");
        assert_eq!(json["threshold"], "0.75 / 1.35");
        assert!(json["persistence_days"].is_null());
    }

    #[test]
    fn test_float_text_keeps_point_zero() {
        let engine = AlertEngine::new();
        let alarm = engine.acwr_alert(Some(2.0)).unwrap();
        assert_eq!(alarm.context, "ACWR 2.0 outside safe range. Injury/overreach risk elevated.");

        let ri = engine.recovery_index_alert(Some(0.5)).unwrap();
        assert_eq!(ri.context, "RI 0.5 < 0.6. Immediate deload required.");

        let week = vec![day(Some(40.0), None)];
        let hrv = engine.hrv_alert(Some(40.0), Some(50.0), &week).unwrap();
        assert_eq!(hrv.threshold, AlertValue::Label("↓>20% vs baseline (50.0)".to_string()));
        assert!(hrv.context.starts_with("HRV 40.0 is 20.0% below baseline."));
    }

    #[test]
    fn test_strain_threshold_is_integer() {
        let engine = AlertEngine::new();
        let alert = engine.strain_alert(Some(3600.0)).unwrap();
        assert_eq!(alert.threshold, AlertValue::Integer(3500));
        assert_eq!(
            alert.context,
            "Strain 3600.0 > 3500. High cumulative stress. Consider load reduction."
        );

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["threshold"], serde_json::json!(3500));
        assert!(json["threshold"].is_i64());
        assert!(json["value"].is_f64());
    }

    #[test]
    fn test_durability_mean_alarm_boundary() {
        let engine = AlertEngine::new();

        let alerts = engine.durability_alerts(&durability(Some(5.1), Some(5.1), Some(DurabilityTrend::Stable)));
        assert_eq!(alerts.len(), 1);
        let alarm = &alerts[0];
        assert_eq!(alarm.metric, "durability");
        assert_eq!(alarm.severity, Severity::Alarm);
        assert_eq!(alarm.tier, 3);
        assert_eq!(alarm.value, Some(AlertValue::Number(5.1)));
        assert_eq!(alarm.threshold, AlertValue::Label("28d mean > 5%".to_string()));
        assert!(alarm.context.starts_with("Sustained high decoupling (5.1% 28d mean)."));

        let at_limit = durability(Some(5.0), Some(5.0), Some(DurabilityTrend::Stable));
        assert!(engine.durability_alerts(&at_limit).is_empty());
    }

    #[test]
    fn test_durability_declining_warning_boundary() {
        let engine = AlertEngine::new();

        let declining = durability(Some(6.5), Some(4.0), Some(DurabilityTrend::Declining));
        let alerts = engine.durability_alerts(&declining);
        assert_eq!(alerts.len(), 1);
        let warning = &alerts[0];
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.tier, 3);
        assert_eq!(warning.value, Some(AlertValue::Number(6.5)));
        assert_eq!(warning.threshold, AlertValue::Label("7d > 28d by > 2%".to_string()));
        assert_eq!(
            warning.context,
            "Durability declining: 7d mean decoupling 6.5% vs 28d 4.0%. Check fatigue and recovery."
        );

        // delta of exactly 2 points does not warn
        let at_limit = durability(Some(6.0), Some(4.0), Some(DurabilityTrend::Declining));
        assert!(engine.durability_alerts(&at_limit).is_empty());

        // a wide gap without a declining trend does not warn either
        let stable = durability(Some(6.5), Some(4.0), Some(DurabilityTrend::Stable));
        assert!(engine.durability_alerts(&stable).is_empty());
    }

    #[test]
    fn test_durability_high_drift_sessions() {
        let engine = AlertEngine::new();
        let mut m = quiet_metrics();

        m.capability.durability.high_drift_count_7d = 3;
        let alerts = engine.durability_alerts(&m);
        assert_eq!(alerts.len(), 1);
        let warning = &alerts[0];
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.tier, 3);
        assert_eq!(warning.value, Some(AlertValue::Integer(3)));
        assert_eq!(
            warning.threshold,
            AlertValue::Label(">= 3 sessions with >5% decoupling in 7d".to_string())
        );
        assert_eq!(
            warning.context,
            "Repeated poor durability: 3 sessions with >5% decoupling in last 7 days."
        );

        m.capability.durability.high_drift_count_7d = 2;
        assert!(engine.durability_alerts(&m).is_empty());
    }

    #[test]
    fn test_high_drift_text_follows_configured_cutoff() {
        let mut config = EngineConfig::default();
        config.durability.high_drift_pct = 7.5;
        let engine = AlertEngine::with_config(&config);

        let mut m = quiet_metrics();
        m.capability.durability.high_drift_count_7d = 4;
        let alerts = engine.durability_alerts(&m);
        assert_eq!(
            alerts[0].threshold,
            AlertValue::Label(">= 3 sessions with >7.5% decoupling in 7d".to_string())
        );
        assert!(alerts[0].context.contains("4 sessions with >7.5% decoupling"));
    }

    #[test]
    fn test_tid_acute_depolarization_alert() {
        let engine = AlertEngine::new();
        let mut m = quiet_metrics();
        let cmp = &mut m.capability.tid_comparison;
        cmp.classification_7d = Some(TidClass::Pyramidal);
        cmp.classification_28d = Some(TidClass::Polarized);
        cmp.pi_7d = Some(1.8);
        cmp.pi_28d = Some(2.0);
        cmp.drift = Some(TidDrift::AcuteDepolarization);

        let alert = engine.tid_alert(&m).unwrap();
        assert_eq!(alert.metric, "tid_distribution");
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.tier, 3);
        assert_eq!(alert.value, Some(AlertValue::Number(1.8)));
        assert_eq!(alert.threshold, AlertValue::Label("7d PI < 2.0, 28d PI >= 2.0".to_string()));
        assert!(alert.context.starts_with("Acute depolarization: 7d PI 1.8 vs 28d PI 2.0."));
    }

    #[test]
    fn test_tid_shift_alert() {
        let engine = AlertEngine::new();
        let mut m = quiet_metrics();
        let cmp = &mut m.capability.tid_comparison;
        cmp.classification_7d = Some(TidClass::Threshold);
        cmp.classification_28d = Some(TidClass::Pyramidal);
        cmp.drift = Some(TidDrift::Shifting);

        let alert = engine.tid_alert(&m).unwrap();
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.tier, 3);
        assert_eq!(alert.value, Some(AlertValue::Label("Threshold".to_string())));
        assert_eq!(alert.threshold, AlertValue::Label("7d/28d classification mismatch".to_string()));
        assert_eq!(
            alert.context,
            "TID shift: 7d Threshold vs 28d Pyramidal. Training distribution changing."
        );

        m.capability.tid_comparison.drift = Some(TidDrift::Consistent);
        assert!(engine.tid_alert(&m).is_none());
        m.capability.tid_comparison.drift = None;
        assert!(engine.tid_alert(&m).is_none());
    }

    #[test]
    fn test_monotony_multi_sport_note() {
        let engine = AlertEngine::new();
        let mut m = quiet_metrics();
        m.monotony = Some(2.8);
        m.primary_sport = Some(SportFamily::Cycling);
        m.primary_sport_monotony = Some(2.4);
        m.effective_monotony = Some(2.4);
        m.multi_sport_detected = true;
        m.tss_7d_total = 400.0;
        m.tss_28d_total = 1600.0;

        let alert = engine.monotony_alert(&m).unwrap();
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.tier, 2);
        assert_eq!(alert.threshold, AlertValue::Number(2.3));
        assert_eq!(
            alert.context,
            "Monotony 2.4 approaching overuse threshold. Alarm at 2.5. (total monotony 2.8 \
             inflated by multi-sport training; cycling monotony 2.4 used for alerting)"
        );

        // primary sport no less monotonous than the total: no note, total drives the alert
        m.primary_sport_monotony = Some(2.9);
        m.effective_monotony = Some(2.8);
        let alert = engine.monotony_alert(&m).unwrap();
        assert_eq!(alert.severity, Severity::Alarm);
        assert_eq!(alert.context, "Monotony 2.8 ≥ 2.5. Overuse risk elevated. Vary training load.");
    }
}
