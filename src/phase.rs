//! Training phase detection
//!
//! Each run classifies the current snapshot independently. Rules are tried in
//! order and the first one that fires decides the phase, together with the
//! trigger list that explains it.

use crate::config::PhaseThresholds;
use crate::stats::fmt_float;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Overreached,
    Recovery,
    Taper,
    Build,
    Base,
    Peak,
    Indeterminate,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Overreached => "Overreached",
            Phase::Recovery => "Recovery",
            Phase::Taper => "Taper",
            Phase::Build => "Build",
            Phase::Base => "Base",
            Phase::Peak => "Peak",
            Phase::Indeterminate => "Indeterminate",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot values the cascade looks at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseInputs {
    pub acwr: Option<f64>,
    pub recovery_index: Option<f64>,
    pub quality_intensity_pct: Option<f64>,
    pub hard_days: u32,
    pub strain: Option<f64>,
    pub monotony: Option<f64>,
    pub tsb: Option<f64>,
    pub ctl: Option<f64>,
}

/// Outcome of phase detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseAssessment {
    pub phase: Phase,
    pub triggers: Vec<String>,
}

/// A rule returns its trigger list when it fires
pub struct PhaseRule {
    pub phase: Phase,
    pub evaluate: fn(&PhaseInputs, &PhaseThresholds) -> Option<Vec<String>>,
}

/// Cascade in priority order; `Indeterminate` catches everything else
pub const PHASE_RULES: [PhaseRule; 7] = [
    PhaseRule {
        phase: Phase::Overreached,
        evaluate: overreached,
    },
    PhaseRule {
        phase: Phase::Recovery,
        evaluate: recovery,
    },
    PhaseRule {
        phase: Phase::Taper,
        evaluate: taper,
    },
    PhaseRule {
        phase: Phase::Build,
        evaluate: build,
    },
    PhaseRule {
        phase: Phase::Base,
        evaluate: base,
    },
    PhaseRule {
        phase: Phase::Peak,
        evaluate: peak,
    },
    PhaseRule {
        phase: Phase::Indeterminate,
        evaluate: |_, _| Some(vec!["Insufficient data for phase detection".to_string()]),
    },
];

pub struct PhaseDetector {
    config: PhaseThresholds,
}

impl PhaseDetector {
    pub fn new() -> Self {
        PhaseDetector {
            config: PhaseThresholds::default(),
        }
    }

    pub fn with_config(config: PhaseThresholds) -> Self {
        PhaseDetector { config }
    }

    pub fn detect(&self, inputs: &PhaseInputs) -> PhaseAssessment {
        let assessment = PHASE_RULES
            .iter()
            .find_map(|rule| {
                (rule.evaluate)(inputs, &self.config).map(|triggers| PhaseAssessment {
                    phase: rule.phase,
                    triggers,
                })
            })
            .unwrap_or(PhaseAssessment {
                phase: Phase::Indeterminate,
                triggers: Vec::new(),
            });

        tracing::debug!(
            phase = %assessment.phase,
            triggers = ?assessment.triggers,
            "Phase detected"
        );
        assessment
    }
}

impl Default for PhaseDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn above(value: Option<f64>, limit: f64) -> Option<f64> {
    value.filter(|v| *v > limit)
}

fn overreached(i: &PhaseInputs, t: &PhaseThresholds) -> Option<Vec<String>> {
    let mut triggers = Vec::new();
    if let Some(acwr) = above(i.acwr, t.acwr_high) {
        triggers.push(format!("ACWR {} > {}", fmt_float(acwr), fmt_float(t.acwr_high)));
    }
    if let Some(strain) = above(i.strain, t.strain_high) {
        triggers.push(format!("Strain {} > {}", fmt_float(strain), t.strain_high));
    }
    let ri_low = i.recovery_index.filter(|ri| *ri < t.recovery_index_low);
    if let Some(ri) = ri_low {
        triggers.push(format!("RI {} < {}", fmt_float(ri), fmt_float(t.recovery_index_low)));
    }
    if let Some(monotony) = above(i.monotony, t.monotony_high) {
        triggers.push(format!("Monotony {} > {}", fmt_float(monotony), fmt_float(t.monotony_high)));
    }

    (triggers.len() >= 2 || ri_low.is_some()).then_some(triggers)
}

fn recovery(i: &PhaseInputs, t: &PhaseThresholds) -> Option<Vec<String>> {
    above(i.tsb, t.tsb_recovery).map(|tsb| vec![format!("TSB {} > +{}", fmt_float(tsb), t.tsb_recovery)])
}

fn taper(i: &PhaseInputs, t: &PhaseThresholds) -> Option<Vec<String>> {
    let tsb = i.tsb.filter(|tsb| *tsb > 0.0 && *tsb <= t.tsb_recovery)?;
    i.ctl.filter(|ctl| *ctl != 0.0)?;
    Some(vec![
        format!("TSB {} positive", fmt_float(tsb)),
        "CTL stable/declining".to_string(),
    ])
}

fn build_by_time(i: &PhaseInputs, t: &PhaseThresholds) -> Option<f64> {
    i.quality_intensity_pct
        .filter(|q| *q >= t.quality_build_min_pct && *q <= t.quality_build_max_pct)
}

fn build_by_sessions(i: &PhaseInputs, t: &PhaseThresholds) -> bool {
    i.hard_days >= t.hard_days_build
}

fn build(i: &PhaseInputs, t: &PhaseThresholds) -> Option<Vec<String>> {
    let acwr = i.acwr.filter(|a| *a >= t.acwr_low && *a <= t.acwr_high)?;
    let by_time = build_by_time(i, t);
    let by_sessions = build_by_sessions(i, t);
    if by_time.is_none() && !by_sessions {
        return None;
    }

    let mut triggers = vec![format!(
        "ACWR {} in {}-{}",
        fmt_float(acwr),
        fmt_float(t.acwr_low),
        fmt_float(t.acwr_high)
    )];
    if let Some(q) = by_time {
        triggers.push(format!(
            "Quality Intensity {}% in {}-{}%",
            fmt_float(q),
            t.quality_build_min_pct,
            t.quality_build_max_pct
        ));
    }
    if by_sessions {
        triggers.push(format!(
            "Hard days {}/week >= {}",
            i.hard_days, t.hard_days_build
        ));
    }
    Some(triggers)
}

fn base(i: &PhaseInputs, t: &PhaseThresholds) -> Option<Vec<String>> {
    let acwr = i.acwr.filter(|a| *a >= t.acwr_low && *a < t.acwr_mid)?;
    if build_by_time(i, t).is_some() || build_by_sessions(i, t) {
        return None;
    }

    let mut triggers = vec![format!(
        "ACWR {} in {}-{}",
        fmt_float(acwr),
        fmt_float(t.acwr_low),
        fmt_float(t.acwr_mid)
    )];
    if let Some(q) = i.quality_intensity_pct {
        triggers.push(format!(
            "Quality Intensity {}% < {}%",
            fmt_float(q),
            t.quality_build_min_pct
        ));
    }
    triggers.push(format!(
        "Hard days {}/week <= {}",
        i.hard_days,
        t.hard_days_build.saturating_sub(1)
    ));
    Some(triggers)
}

fn peak(i: &PhaseInputs, t: &PhaseThresholds) -> Option<Vec<String>> {
    let acwr = i.acwr.filter(|a| *a >= t.acwr_mid)?;
    let by_time = above(i.quality_intensity_pct, t.quality_peak_pct);
    let by_sessions = i.hard_days >= t.hard_days_peak;
    if by_time.is_none() && !by_sessions {
        return None;
    }

    let mut triggers = vec![format!("ACWR {} >= {}", fmt_float(acwr), fmt_float(t.acwr_mid))];
    if let Some(q) = by_time {
        triggers.push(format!("Quality Intensity {}% > {}%", fmt_float(q), t.quality_peak_pct));
    }
    if by_sessions {
        triggers.push(format!(
            "Hard days {}/week >= {}",
            i.hard_days, t.hard_days_peak
        ));
    }
    Some(triggers)
}
