//! Threshold progression tracking
//!
//! The threshold history is append-only per equipment context: a reading is
//! stored only when it differs from the most recent one.

use crate::error::Result;
use crate::models::parse_day;
use crate::stats::round_dp;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Benchmark lookback in days (8 weeks)
pub const BENCHMARK_LOOKBACK_DAYS: u64 = 56;

/// Accepted distance from the lookback date, in days
pub const BENCHMARK_TOLERANCE_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentContext {
    Indoor,
    Outdoor,
}

impl EquipmentContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentContext::Indoor => "indoor",
            EquipmentContext::Outdoor => "outdoor",
        }
    }
}

/// Date (YYYY-MM-DD) → threshold watts, per equipment context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdHistory {
    #[serde(default)]
    pub indoor: BTreeMap<String, u32>,
    #[serde(default)]
    pub outdoor: BTreeMap<String, u32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SplitHistory {
    #[serde(default)]
    indoor: BTreeMap<String, u32>,
    #[serde(default)]
    outdoor: BTreeMap<String, u32>,
}

/// Accepted on-disk shapes. The flat form predates indoor tracking.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHistory {
    Split(SplitHistory),
    Legacy(BTreeMap<String, u32>),
}

impl ThresholdHistory {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let stored: StoredHistory = serde_json::from_str(content)?;
        Ok(match stored {
            StoredHistory::Split(split) => ThresholdHistory {
                indoor: split.indoor,
                outdoor: split.outdoor,
            },
            StoredHistory::Legacy(flat) => {
                tracing::debug!(entries = flat.len(), "Converting legacy threshold history");
                ThresholdHistory {
                    indoor: BTreeMap::new(),
                    outdoor: flat,
                }
            }
        })
    }

    /// Load from a JSON file; a missing file is an empty history
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn entries(&self, context: EquipmentContext) -> &BTreeMap<String, u32> {
        match context {
            EquipmentContext::Indoor => &self.indoor,
            EquipmentContext::Outdoor => &self.outdoor,
        }
    }

    fn entries_mut(&mut self, context: EquipmentContext) -> &mut BTreeMap<String, u32> {
        match context {
            EquipmentContext::Indoor => &mut self.indoor,
            EquipmentContext::Outdoor => &mut self.outdoor,
        }
    }

    /// Most recent stored value
    pub fn latest(&self, context: EquipmentContext) -> Option<u32> {
        self.entries(context).values().next_back().copied()
    }

    /// Append `value` under `date` if it differs from the latest stored value.
    /// Returns whether an entry was added.
    pub fn record(&mut self, context: EquipmentContext, date: NaiveDate, value: Option<u32>) -> bool {
        let Some(value) = value.filter(|v| *v > 0) else {
            return false;
        };
        let previous = self.latest(context);
        if previous == Some(value) {
            return false;
        }

        self.entries_mut(context)
            .insert(date.format("%Y-%m-%d").to_string(), value);
        tracing::debug!(
            context = context.as_str(),
            ?previous,
            current = value,
            "Threshold recorded"
        );
        true
    }

    /// Days between oldest and newest entry; 0 below two entries
    pub fn span_days(&self, context: EquipmentContext) -> i64 {
        let entries = self.entries(context);
        if entries.len() < 2 {
            return 0;
        }
        let oldest = entries.keys().next().and_then(|d| parse_day(d));
        let newest = entries.keys().next_back().and_then(|d| parse_day(d));
        match (oldest, newest) {
            (Some(o), Some(n)) => (n - o).num_days(),
            _ => 0,
        }
    }

    pub fn span(&self) -> HistorySpan {
        HistorySpan {
            indoor: self.span_days(EquipmentContext::Indoor),
            outdoor: self.span_days(EquipmentContext::Outdoor),
        }
    }

    /// Value recorded closest to 56 days before `today`, within ±7 days
    pub fn value_near_lookback(&self, context: EquipmentContext, today: NaiveDate) -> Option<u32> {
        let target = today.checked_sub_days(Days::new(BENCHMARK_LOOKBACK_DAYS))?;
        let tolerance = BENCHMARK_TOLERANCE_DAYS as i64;

        let mut best: Option<(i64, u32)> = None;
        for (date, value) in self.entries(context) {
            let Some(day) = parse_day(date) else {
                continue;
            };
            let diff = (day - target).num_days().abs();
            if diff <= tolerance && best.map_or(true, |(d, _)| diff < d) {
                best = Some((diff, *value));
            }
        }
        best.map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySpan {
    pub indoor: i64,
    pub outdoor: i64,
}

/// Calendar-derived training season (northern hemisphere)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    #[serde(rename = "Off-season / Transition")]
    OffSeason,
    #[serde(rename = "Early Base")]
    EarlyBase,
    #[serde(rename = "Late Base / Build")]
    LateBase,
    #[serde(rename = "Build / Early Race Season")]
    EarlyRaceSeason,
    #[serde(rename = "Peak Race Season")]
    PeakRaceSeason,
    #[serde(rename = "Late Season / Transition")]
    LateSeason,
}

impl Season {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.month() {
            11 | 12 => Season::OffSeason,
            1 | 2 => Season::EarlyBase,
            3 | 4 => Season::LateBase,
            5 | 6 => Season::EarlyRaceSeason,
            7 | 8 => Season::PeakRaceSeason,
            _ => Season::LateSeason,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Season::OffSeason => "Off-season / Transition",
            Season::EarlyBase => "Early Base",
            Season::LateBase => "Late Base / Build",
            Season::EarlyRaceSeason => "Build / Early Race Season",
            Season::PeakRaceSeason => "Peak Race Season",
            Season::LateSeason => "Late Season / Transition",
        }
    }

    /// Expected 8-week threshold change as (low, high) fractions
    pub fn expected_range(&self) -> (f64, f64) {
        match self {
            Season::OffSeason => (-0.05, -0.02),
            Season::EarlyBase => (-0.02, 0.01),
            Season::LateBase => (0.02, 0.05),
            Season::EarlyRaceSeason => (0.01, 0.04),
            Season::PeakRaceSeason => (0.01, 0.03),
            Season::LateSeason => (-0.03, 0.0),
        }
    }

    pub fn expects(&self, benchmark_index: f64) -> bool {
        let (low, high) = self.expected_range();
        (low..=high).contains(&benchmark_index)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Threshold progression for one equipment context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkBlock {
    pub current_ftp: Option<u32>,
    pub ftp_8_weeks_ago: Option<u32>,
    pub benchmark_index: Option<f64>,
    pub benchmark_percentage: Option<String>,
    pub seasonal_expected: Option<bool>,
}

impl BenchmarkBlock {
    /// Index = current / value 8 weeks ago - 1 (3 dp)
    pub fn evaluate(
        context: EquipmentContext,
        current: Option<u32>,
        history: &ThresholdHistory,
        today: NaiveDate,
        season: Season,
    ) -> Self {
        let current = current.filter(|v| *v > 0);
        let previous = current.and_then(|_| history.value_near_lookback(context, today));

        let index = match (current, previous) {
            (Some(c), Some(p)) if p > 0 => Some(round_dp(c as f64 / p as f64 - 1.0, 3)),
            _ => None,
        };

        match index {
            Some(i) => tracing::debug!(context = context.as_str(), index = i, "Benchmark index"),
            None => tracing::debug!(
                context = context.as_str(),
                span_days = history.span_days(context),
                "Benchmark index unavailable"
            ),
        }

        BenchmarkBlock {
            current_ftp: current,
            ftp_8_weeks_ago: index.and(previous),
            benchmark_index: index,
            benchmark_percentage: index.map(format_signed_percent),
            seasonal_expected: index.map(|i| season.expects(i)),
        }
    }
}

/// Fraction as a signed one-decimal percentage, e.g. 0.025 → "+2.5%"
pub fn format_signed_percent(fraction: f64) -> String {
    format!("{:+.1}%", fraction * 100.0)
}
