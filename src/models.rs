use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Labels of the 7-zone model, in order. Heart-rate zone arrays are mapped
/// onto these positionally.
pub const ZONE_LABELS: [&str; 7] = ["z1", "z2", "z3", "z4", "z5", "z6", "z7"];

/// Sport family used to disaggregate load for multi-sport athletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SportFamily {
    Cycling,
    Ski,
    Walk,
    Run,
    Swim,
    Rowing,
    Strength,
    Other,
}

impl SportFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            SportFamily::Cycling => "cycling",
            SportFamily::Ski => "ski",
            SportFamily::Walk => "walk",
            SportFamily::Run => "run",
            SportFamily::Swim => "swim",
            SportFamily::Rowing => "rowing",
            SportFamily::Strength => "strength",
            SportFamily::Other => "other",
        }
    }

    /// Look up an activity type in a family table; unmapped types are `Other`.
    pub fn lookup(table: FamilyTable, activity_type: &str) -> Self {
        table
            .iter()
            .find(|(name, _)| *name == activity_type)
            .map(|(_, family)| *family)
            .unwrap_or(SportFamily::Other)
    }
}

impl fmt::Display for SportFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable activity-type → sport-family mapping
pub type FamilyTable = &'static [(&'static str, SportFamily)];

/// Default family table.
///
/// Cross-training adds a steady load floor across days, so monotony is also
/// computed per family to isolate the variation of the main modality.
pub const SPORT_FAMILIES: FamilyTable = &[
    ("Ride", SportFamily::Cycling),
    ("VirtualRide", SportFamily::Cycling),
    ("MountainBikeRide", SportFamily::Cycling),
    ("GravelRide", SportFamily::Cycling),
    ("EBikeRide", SportFamily::Cycling),
    ("VirtualSki", SportFamily::Ski),
    ("NordicSki", SportFamily::Ski),
    ("Walk", SportFamily::Walk),
    ("Hike", SportFamily::Walk),
    ("Run", SportFamily::Run),
    ("VirtualRun", SportFamily::Run),
    ("TrailRun", SportFamily::Run),
    ("Swim", SportFamily::Swim),
    ("Rowing", SportFamily::Rowing),
    ("WeightTraining", SportFamily::Strength),
    ("Yoga", SportFamily::Other),
    ("Workout", SportFamily::Other),
];

/// Activity types counted as completions when measuring plan consistency.
/// Restricted to one equipment family so planned and completed days compare fairly.
pub const CONSISTENCY_TYPES: &[&str] = &["Ride", "VirtualRide", "MountainBikeRide", "GravelRide"];

/// Time spent in one named zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneTime {
    /// Zone identifier as reported by the source ("Z1".."Z7", sometimes "SS")
    #[serde(default)]
    pub id: String,

    /// Seconds in zone
    #[serde(default)]
    pub secs: Option<f64>,
}

/// One completed training session. Read-only within an engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(default)]
    pub id: Option<String>,

    /// Local start date (or datetime); only the leading YYYY-MM-DD is used
    #[serde(alias = "start_date_local")]
    pub date: String,

    /// Source sport type, e.g. "Ride", "Run", "VirtualRide"
    #[serde(rename = "type", default = "unknown_type")]
    pub activity_type: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: Option<f64>,

    /// Distance in meters
    #[serde(default)]
    pub distance: Option<f64>,

    /// TSS-equivalent load
    #[serde(default, alias = "icu_training_load")]
    pub training_load: Option<f64>,

    /// Power time-in-zone, preferred source for zone analysis
    #[serde(default, alias = "icu_zone_times")]
    pub power_zone_times: Option<Vec<ZoneTime>>,

    /// Heart-rate time-in-zone, positional Z1..Z7
    #[serde(default, alias = "icu_hr_zone_times")]
    pub hr_zone_times: Option<Vec<Option<f64>>>,

    #[serde(default, alias = "icu_average_watts")]
    pub average_power: Option<f64>,

    #[serde(default, alias = "icu_weighted_avg_watts")]
    pub normalized_power: Option<f64>,

    /// Aerobic decoupling in percent (HR drift relative to power)
    #[serde(default, alias = "icu_hr_decoupling")]
    pub decoupling: Option<f64>,

    /// Power variability index (NP / average power)
    #[serde(default, alias = "icu_variability_index")]
    pub variability_index: Option<f64>,

    #[serde(default)]
    pub feel: Option<u8>,

    #[serde(default, alias = "icu_rpe")]
    pub rpe: Option<f64>,
}

fn unknown_type() -> String {
    "Unknown".to_string()
}

impl ActivityRecord {
    /// Parsed calendar day, `None` when the date string is malformed
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }

    /// Training load with absence treated as zero
    pub fn load(&self) -> f64 {
        self.training_load.unwrap_or(0.0)
    }

    pub fn moving_seconds(&self) -> f64 {
        self.moving_time.unwrap_or(0.0)
    }

    pub fn family(&self, table: FamilyTable) -> SportFamily {
        SportFamily::lookup(table, &self.activity_type)
    }

    /// Power-based 7-zone seconds, `None` when no recognised zone is present
    pub fn power_zone_seconds(&self) -> Option<[f64; 7]> {
        let zones = self.power_zone_times.as_ref()?;
        let mut seconds = [0.0; 7];
        let mut found = false;

        for zone in zones {
            let id = zone.id.to_lowercase();
            if let Some(idx) = ZONE_LABELS.iter().position(|label| *label == id) {
                seconds[idx] = zone.secs.unwrap_or(0.0);
                found = true;
            }
        }

        found.then_some(seconds)
    }

    /// Heart-rate 7-zone seconds mapped positionally onto the zone labels
    pub fn hr_zone_seconds(&self) -> Option<[f64; 7]> {
        let zones = self.hr_zone_times.as_ref()?;
        let mut seconds = [0.0; 7];
        let mut found = false;

        for (idx, secs) in zones.iter().take(ZONE_LABELS.len()).enumerate() {
            if let Some(s) = secs.filter(|s| *s != 0.0) {
                seconds[idx] = s;
                found = true;
            }
        }

        found.then_some(seconds)
    }

    /// Zone seconds from power when available, else heart rate
    pub fn zone_seconds(&self) -> Option<[f64; 7]> {
        self.power_zone_seconds().or_else(|| self.hr_zone_seconds())
    }
}

/// Per-sport model values reported alongside daily wellness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportInfo {
    #[serde(rename = "type", default)]
    pub sport_type: String,

    #[serde(default)]
    pub eftp: Option<f64>,

    /// W' in joules
    #[serde(default, alias = "wPrime")]
    pub w_prime: Option<f64>,

    #[serde(default, alias = "pMax")]
    pub p_max: Option<f64>,
}

/// One calendar day's physiological snapshot
///
/// HRV values outside the valid range are kept on the record but ignored
/// by every computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellnessRecord {
    /// Calendar day (YYYY-MM-DD)
    #[serde(alias = "id")]
    pub date: String,

    /// HRV RMSSD in milliseconds
    #[serde(default)]
    pub hrv: Option<f64>,

    /// Resting heart rate in bpm
    #[serde(default, alias = "restingHR")]
    pub resting_hr: Option<f64>,

    #[serde(default, alias = "sleepSecs")]
    pub sleep_secs: Option<f64>,

    #[serde(default, alias = "sleepQuality")]
    pub sleep_quality: Option<f64>,

    #[serde(default, alias = "sleepScore")]
    pub sleep_score: Option<f64>,

    /// Body weight in kg
    #[serde(default)]
    pub weight: Option<f64>,

    /// Fitness (chronic load)
    #[serde(default)]
    pub ctl: Option<f64>,

    /// Fatigue (acute load)
    #[serde(default)]
    pub atl: Option<f64>,

    #[serde(default, alias = "rampRate")]
    pub ramp_rate: Option<f64>,

    #[serde(default)]
    pub vo2max: Option<f64>,

    #[serde(default, alias = "sportInfo")]
    pub sport_info: Vec<SportInfo>,
}

impl WellnessRecord {
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }
}

/// Category of a calendar event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    Workout,
    RaceA,
    RaceB,
    RaceC,
    #[default]
    #[serde(other)]
    Other,
}

impl EventCategory {
    pub fn is_race(&self) -> bool {
        matches!(
            self,
            EventCategory::RaceA | EventCategory::RaceB | EventCategory::RaceC
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Workout => "WORKOUT",
            EventCategory::RaceA => "RACE_A",
            EventCategory::RaceB => "RACE_B",
            EventCategory::RaceC => "RACE_C",
            EventCategory::Other => "OTHER",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A planned workout or race on the calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(alias = "start_date_local")]
    pub date: String,

    #[serde(default)]
    pub category: EventCategory,

    #[serde(default)]
    pub name: Option<String>,

    /// Sport type of the event
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,

    /// Planned load
    #[serde(default, alias = "icu_training_load")]
    pub planned_load: Option<f64>,

    /// Planned duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,

    /// Expected moving time in seconds (drives race duration class)
    #[serde(default)]
    pub moving_time: Option<f64>,

    /// Expected distance in meters
    #[serde(default)]
    pub distance: Option<f64>,
}

impl EventRecord {
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }
}

/// User-set thresholds and physiological anchors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    #[serde(default)]
    pub athlete_id: Option<String>,

    /// Indoor (trainer) FTP in watts
    #[serde(default)]
    pub ftp_indoor: Option<u32>,

    /// Outdoor FTP in watts
    #[serde(default)]
    pub ftp_outdoor: Option<u32>,

    #[serde(default)]
    pub lthr: Option<u32>,

    #[serde(default)]
    pub max_hr: Option<u32>,

    #[serde(default)]
    pub resting_hr: Option<f64>,

    #[serde(default)]
    pub weight: Option<f64>,

    #[serde(default)]
    pub vo2max: Option<f64>,
}

/// Everything the engine needs for one run, as delivered by ingestion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    #[serde(default)]
    pub profile: AthleteProfile,

    /// Completed activities covering at least the chronic window
    #[serde(default)]
    pub activities: Vec<ActivityRecord>,

    /// Wellness days covering at least the chronic window
    #[serde(default)]
    pub wellness: Vec<WellnessRecord>,

    #[serde(default)]
    pub wellness_yesterday: Option<WellnessRecord>,

    #[serde(default)]
    pub wellness_today: Option<WellnessRecord>,

    /// Planned workouts and races, past week through the race horizon
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

/// Parse the leading YYYY-MM-DD of a date or datetime string
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    value
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// First day of an N-day window ending on (and including) `today`
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(days.saturating_sub(1) as u64))
        .unwrap_or(today)
}
