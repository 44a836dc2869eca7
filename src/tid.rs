//! Training intensity distribution (Seiler 3-zone model)
//!
//! 7-zone time is pooled into easy (Z1+Z2), moderate (Z3) and hard (Z4..Z7).
//! The shape is classified by an ordered rule list where the first match wins.

use crate::load::ZoneTotals;
use crate::models::SportFamily;
use crate::stats::round_dp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// PI above which a polarized shape counts as truly polarized
pub const POLARIZED_PI_THRESHOLD: f64 = 2.0;

/// Hard share below which a distribution has no meaningful high-intensity work
pub const MIN_HARD_SHARE: f64 = 0.01;

/// Substitute moderate share when it is zero in a polarized shape
const Z2_FLOOR: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TidClass {
    Base,
    Polarized,
    Pyramidal,
    Threshold,
    #[serde(rename = "High Intensity")]
    HighIntensity,
}

impl TidClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TidClass::Base => "Base",
            TidClass::Polarized => "Polarized",
            TidClass::Pyramidal => "Pyramidal",
            TidClass::Threshold => "Threshold",
            TidClass::HighIntensity => "High Intensity",
        }
    }
}

impl fmt::Display for TidClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fractions of pooled time in the three Seiler zones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneShares {
    pub z1: f64,
    pub z2: f64,
    pub z3: f64,
}

impl ZoneShares {
    /// `None` when there is no zone time at all
    pub fn from_seconds(z1: f64, z2: f64, z3: f64) -> Option<Self> {
        let total = z1 + z2 + z3;
        (total > 0.0).then(|| ZoneShares {
            z1: z1 / total,
            z2: z2 / total,
            z3: z3 / total,
        })
    }

    fn polarized_shape(&self) -> bool {
        self.z1 > self.z3 && self.z3 > self.z2
    }

    /// Treff polarization index: log10((z1 / z2) * z3 * 100), 2 dp.
    ///
    /// Defined only for a polarized shape with real hard work.
    pub fn polarization_index(&self) -> Option<f64> {
        if self.z3 < MIN_HARD_SHARE || !self.polarized_shape() {
            return None;
        }
        let z2 = if self.z2 > 0.0 { self.z2 } else { Z2_FLOOR };
        let raw = (self.z1 / z2) * self.z3 * 100.0;
        (raw > 0.0).then(|| round_dp(raw.log10(), 2))
    }
}

/// One entry of the classification cascade
pub struct TidRule {
    pub class: TidClass,
    pub description: &'static str,
    pub applies: fn(&ZoneShares, Option<f64>) -> bool,
}

/// Classification rules in priority order
pub const TID_RULES: [TidRule; 5] = [
    TidRule {
        class: TidClass::Base,
        description: "hard share < 1% and easy share largest",
        applies: |s, _| s.z3 < MIN_HARD_SHARE && s.z1 >= s.z2 && s.z1 >= s.z3,
    },
    TidRule {
        class: TidClass::Polarized,
        description: "easy > hard > moderate and PI > 2.0",
        applies: |s, pi| s.polarized_shape() && pi.is_some_and(|p| p > POLARIZED_PI_THRESHOLD),
    },
    TidRule {
        class: TidClass::Pyramidal,
        description: "easy > moderate > hard",
        applies: |s, _| s.z1 > s.z2 && s.z2 > s.z3,
    },
    TidRule {
        class: TidClass::Threshold,
        description: "moderate share largest",
        applies: |s, _| s.z2 >= s.z1 && s.z2 >= s.z3,
    },
    TidRule {
        class: TidClass::HighIntensity,
        description: "hard share largest",
        applies: |s, _| s.z3 >= s.z1 && s.z3 >= s.z2,
    },
];

/// Class given to shares no rule claims, e.g. a polarized shape whose PI
/// stays at or below 2.0
pub const TID_FALLBACK: TidClass = TidClass::Pyramidal;

pub fn classify(shares: &ZoneShares, pi: Option<f64>) -> TidClass {
    TID_RULES
        .iter()
        .find(|rule| (rule.applies)(shares, pi))
        .map(|rule| rule.class)
        .unwrap_or(TID_FALLBACK)
}

/// Seiler distribution for one window (and optionally one sport family)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeilerTid {
    pub z1_seconds: f64,
    pub z2_seconds: f64,
    pub z3_seconds: f64,
    pub z1_pct: Option<f64>,
    pub z2_pct: Option<f64>,
    pub z3_pct: Option<f64>,
    pub polarization_index: Option<f64>,
    pub classification: Option<TidClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<SportFamily>,
}

impl SeilerTid {
    pub fn from_totals(totals: &ZoneTotals) -> Self {
        let (z1, z2, z3) = totals.seiler();
        let Some(shares) = ZoneShares::from_seconds(z1, z2, z3) else {
            return SeilerTid::default();
        };

        let pi = shares.polarization_index();
        SeilerTid {
            z1_seconds: z1,
            z2_seconds: z2,
            z3_seconds: z3,
            z1_pct: Some(round_dp(shares.z1 * 100.0, 1)),
            z2_pct: Some(round_dp(shares.z2 * 100.0, 1)),
            z3_pct: Some(round_dp(shares.z3 * 100.0, 1)),
            polarization_index: pi,
            classification: Some(classify(&shares, pi)),
            sport: None,
        }
    }

    pub fn for_sport(mut self, sport: SportFamily) -> Self {
        self.sport = Some(sport);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TidDrift {
    AcuteDepolarization,
    Shifting,
    Consistent,
}

impl TidDrift {
    pub fn as_str(&self) -> &'static str {
        match self {
            TidDrift::AcuteDepolarization => "acute_depolarization",
            TidDrift::Shifting => "shifting",
            TidDrift::Consistent => "consistent",
        }
    }
}

/// Acute vs chronic distribution comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidComparison {
    pub classification_7d: Option<TidClass>,
    pub classification_28d: Option<TidClass>,
    pub pi_7d: Option<f64>,
    pub pi_28d: Option<f64>,
    /// Positive means more polarized acutely
    pub pi_delta: Option<f64>,
    pub drift: Option<TidDrift>,
    pub note: String,
}

impl TidComparison {
    pub fn compare(acute: &SeilerTid, chronic: &SeilerTid) -> Self {
        let pi_7d = acute.polarization_index;
        let pi_28d = chronic.polarization_index;

        let (Some(cls_7d), Some(cls_28d)) = (acute.classification, chronic.classification) else {
            return TidComparison {
                classification_7d: acute.classification,
                classification_28d: chronic.classification,
                pi_7d,
                pi_28d,
                pi_delta: None,
                drift: None,
                note: "Compares 7d vs 28d Seiler TID to detect distribution shifts. \
                       Insufficient data in one or both windows."
                    .to_string(),
            };
        };

        let pi_delta = match (pi_7d, pi_28d) {
            (Some(a), Some(c)) => Some(round_dp(a - c, 2)),
            _ => None,
        };

        let depolarized = matches!(
            (pi_7d, pi_28d),
            (Some(a), Some(c)) if a < POLARIZED_PI_THRESHOLD && c >= POLARIZED_PI_THRESHOLD
        );
        let drift = if depolarized {
            TidDrift::AcuteDepolarization
        } else if cls_7d != cls_28d {
            TidDrift::Shifting
        } else {
            TidDrift::Consistent
        };

        tracing::debug!(
            classification_7d = %cls_7d,
            classification_28d = %cls_28d,
            ?pi_7d,
            ?pi_28d,
            drift = drift.as_str(),
            "TID comparison"
        );

        TidComparison {
            classification_7d: Some(cls_7d),
            classification_28d: Some(cls_28d),
            pi_7d,
            pi_28d,
            pi_delta,
            drift: Some(drift),
            note: "Compares 7d vs 28d Seiler TID to detect distribution shifts. \
                   pi_delta positive = more polarized acutely."
                .to_string(),
        }
    }
}
