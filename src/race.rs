//! Race calendar and race-week protocol
//!
//! Three layers of race awareness:
//! 1. every race inside the forward horizon,
//! 2. a taper-onset notice when an A race is 8-14 days out,
//! 3. a day-by-day protocol once an A or B race is inside race week.
//!
//! Load targets are fractions of CTL; race-day form is projected with the PMC
//! decay constants assuming no further training.

use crate::alerts::{Alert, AlertValue, Severity};
use crate::config::{EngineConfig, RaceSettings};
use crate::fitness::FitnessSnapshot;
use crate::models::{ActivityRecord, EventCategory, EventRecord};
use crate::stats::{fmt_float, round_dp, round_whole};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Events shorter than this are short and intense; also the carb-loading cutoff
pub const SHORT_EVENT_SECONDS: f64 = 5400.0;

/// Events longer than this are long endurance
pub const LONG_EVENT_SECONDS: f64 = 10800.0;

/// Carb loading starts this many days out
pub const CARB_LOADING_START_DAY: i64 = 4;

/// Opener session day
pub const OPENER_DAY: i64 = 2;

const CARB_LOADING_NOTE: &str = "10-12 g·kg⁻¹/day. No depletion phase needed.";

/// One entry of the forward race calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEntry {
    pub name: String,
    pub date: String,
    pub category: EventCategory,
    #[serde(rename = "type")]
    pub event_type: String,
    pub days_until: i64,
    pub moving_time_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaperAlert {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationClass {
    ShortIntense,
    Medium,
    LongEndurance,
}

impl DurationClass {
    /// Classify by expected moving time. Without one, A races are assumed
    /// long and everything else medium.
    pub fn classify(moving_time: Option<f64>, category: EventCategory) -> Self {
        match moving_time {
            Some(t) if t < SHORT_EVENT_SECONDS => DurationClass::ShortIntense,
            Some(t) if t <= LONG_EVENT_SECONDS => DurationClass::Medium,
            Some(_) => DurationClass::LongEndurance,
            None if category == EventCategory::RaceA => DurationClass::LongEndurance,
            None => DurationClass::Medium,
        }
    }

    /// Race-day TSB target for an A race
    pub fn tsb_target(&self) -> TsbRange {
        match self {
            DurationClass::ShortIntense => TsbRange { min: 5, max: 15 },
            DurationClass::Medium => TsbRange { min: 10, max: 20 },
            DurationClass::LongEndurance => TsbRange { min: 10, max: 25 },
        }
    }

    pub fn opener_intensity(&self) -> OpenerIntensity {
        match self {
            DurationClass::ShortIntense => OpenerIntensity::MoreIntense,
            DurationClass::Medium => OpenerIntensity::Standard,
            DurationClass::LongEndurance => OpenerIntensity::Lighter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationClass::ShortIntense => "short_intense",
            DurationClass::Medium => "medium",
            DurationClass::LongEndurance => "long_endurance",
        }
    }
}

impl fmt::Display for DurationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenerIntensity {
    Lighter,
    Standard,
    MoreIntense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsbRange {
    pub min: i64,
    pub max: i64,
}

impl TsbRange {
    /// B races aim 5 points lower, never below zero at the bottom
    pub fn for_category(self, category: EventCategory) -> Self {
        if category == EventCategory::RaceB {
            TsbRange {
                min: (self.min - 5).max(0),
                max: self.max - 5,
            }
        } else {
            self
        }
    }
}

impl fmt::Display for TsbRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Whole-number load band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBand {
    pub min: i64,
    pub max: i64,
}

impl LoadBand {
    fn fraction_of(base: f64, min_pct: f64, max_pct: f64) -> Self {
        LoadBand {
            min: round_whole(base * min_pct),
            max: round_whole(base * max_pct),
        }
    }

    fn remaining_after(&self, spent: i64) -> Self {
        LoadBand {
            min: (self.min - spent).max(0),
            max: (self.max - spent).max(0),
        }
    }
}

/// Guidance for one day of race week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayProtocol {
    pub label: String,
    pub load_target_tss: Option<LoadBand>,
    pub zones: String,
    pub purpose: String,
}

struct DayTemplate {
    label: &'static str,
    min_pct: f64,
    max_pct: f64,
    zones: &'static str,
    purpose: &'static str,
}

/// Race-week days indexed by days until the race (D-0 .. D-7)
const DAY_TEMPLATES: [DayTemplate; 8] = [
    DayTemplate {
        label: "Race day",
        min_pct: 0.0,
        max_pct: 0.0,
        zones: "Race effort",
        purpose: "Go/no-go assessment. Execute race plan.",
    },
    DayTemplate {
        label: "Rest / minimal",
        min_pct: 0.0,
        max_pct: 0.20,
        zones: "Z1 only if active",
        purpose: "Final rest, logistics, equipment check.",
    },
    DayTemplate {
        label: "Opener",
        min_pct: 0.30,
        max_pct: 0.50,
        zones: "3-5 efforts Z4-Z6 (20-60s), high cadence, full recovery",
        purpose: "Neuromuscular activation.",
    },
    DayTemplate {
        label: "Easy / rest",
        min_pct: 0.0,
        max_pct: 0.40,
        zones: "Z1-Z2 only",
        purpose: "Taper tantrums expected (D-4 to D-2). Normal — not lost fitness.",
    },
    DayTemplate {
        label: "Easy / rest",
        min_pct: 0.0,
        max_pct: 0.40,
        zones: "Z1-Z2 only",
        purpose: "Volume reduction. Carb loading begins if applicable.",
    },
    DayTemplate {
        label: "Moderate endurance",
        min_pct: 0.40,
        max_pct: 0.60,
        zones: "Z1-Z2 + 2-3 race-pace touches",
        purpose: "Maintain feel without adding fatigue.",
    },
    DayTemplate {
        label: "Recovery",
        min_pct: 0.0,
        max_pct: 0.30,
        zones: "Z1-Z2 only",
        purpose: "Active recovery.",
    },
    DayTemplate {
        label: "Last key session",
        min_pct: 0.75,
        max_pct: 1.00,
        zones: "3-5 efforts Z4-Z5 (1-3 min)",
        purpose: "Fitness confirmation. Verify strong power/HR response.",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbLoading {
    pub applicable: bool,
    pub active: bool,
    pub starts: String,
    pub start_date: NaiveDate,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opener {
    pub day: String,
    pub date: NaiveDate,
    pub intensity: OpenerIntensity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TsbStatus {
    Green,
    Flag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoNoGo {
    pub tsb_status: TsbStatus,
    pub notes: Vec<String>,
}

/// Full protocol for an active race week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceWeekProtocol {
    pub active: bool,
    pub event_name: String,
    pub event_date: String,
    pub event_category: EventCategory,
    pub event_type: String,
    pub event_duration_class: DurationClass,
    pub event_moving_time_seconds: Option<f64>,
    pub days_until_event: i64,
    pub current_day: String,
    pub ctl_baseline: f64,
    pub normal_weekly_tss: f64,
    pub race_week_tss_budget: LoadBand,
    pub race_week_tss_spent: i64,
    pub race_week_tss_remaining: LoadBand,
    pub projected_race_day_tsb: f64,
    pub tsb_target_range: TsbRange,
    pub today: DayProtocol,
    pub carb_loading: CarbLoading,
    pub opener: Opener,
    pub go_no_go: GoNoGo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InactiveRaceWeek {
    pub active: bool,
}

/// Race-week block; serializes to `{"active": false}` outside race week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RaceWeek {
    Active(Box<RaceWeekProtocol>),
    Inactive(InactiveRaceWeek),
}

impl RaceWeek {
    pub fn inactive() -> Self {
        RaceWeek::Inactive(InactiveRaceWeek { active: false })
    }

    pub fn protocol(&self) -> Option<&RaceWeekProtocol> {
        match self {
            RaceWeek::Active(protocol) => Some(&**protocol),
            RaceWeek::Inactive(_) => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.protocol().is_some()
    }
}

impl Default for RaceWeek {
    fn default() -> Self {
        Self::inactive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceCalendar {
    pub next_race: Option<RaceEntry>,
    pub all_races: Vec<RaceEntry>,
    pub taper_alert: TaperAlert,
    pub race_week: RaceWeek,
}

/// Race-week load budget as a fraction of normal weekly load
fn budget_fractions(category: EventCategory) -> (f64, f64) {
    match category {
        EventCategory::RaceA => (0.40, 0.55),
        _ => (0.50, 0.65),
    }
}

fn day_label(days_until: i64) -> String {
    format!("D-{}", days_until.max(0))
}

pub struct RacePlanner {
    settings: RaceSettings,
    horizon_days: i64,
}

impl RacePlanner {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        RacePlanner {
            settings: config.race.clone(),
            horizon_days: config.windows.race_horizon_days as i64,
        }
    }

    /// Races from today through the horizon, nearest first
    pub fn race_entries(&self, events: &[EventRecord], today: NaiveDate) -> Vec<RaceEntry> {
        let mut races: Vec<RaceEntry> = events
            .iter()
            .filter(|e| e.category.is_race())
            .filter_map(|e| {
                let day = e.day()?;
                let days_until = (day - today).num_days();
                (0..=self.horizon_days).contains(&days_until).then(|| RaceEntry {
                    name: e.name.clone().unwrap_or_else(|| "Unnamed Race".to_string()),
                    date: day.format("%Y-%m-%d").to_string(),
                    category: e.category,
                    event_type: e.event_type.clone().unwrap_or_else(|| "Unknown".to_string()),
                    days_until,
                    moving_time_seconds: e.moving_time,
                    distance_meters: e.distance,
                })
            })
            .collect();
        races.sort_by_key(|r| r.days_until);
        races
    }

    pub fn calendar(
        &self,
        future_events: &[EventRecord],
        fitness: &FitnessSnapshot,
        activities_7d: &[ActivityRecord],
        today: NaiveDate,
    ) -> RaceCalendar {
        let races = self.race_entries(future_events, today);

        let taper_alert = races
            .iter()
            .find(|r| {
                r.category == EventCategory::RaceA
                    && (self.settings.taper_window_min_days..=self.settings.taper_window_max_days)
                        .contains(&r.days_until)
            })
            .map(|r| TaperAlert {
                active: true,
                event_name: Some(r.name.clone()),
                event_date: Some(r.date.clone()),
                days_until: Some(r.days_until),
                message: Some(format!(
                    "RACE_A '{}' in {} days. Begin volume reduction (target 41-60% over 2 weeks). \
                     Maintain intensity. CTL should peak now or within the next few days.",
                    r.name, r.days_until
                )),
            })
            .unwrap_or_default();

        let in_race_week = |r: &&RaceEntry| {
            matches!(r.category, EventCategory::RaceA | EventCategory::RaceB)
                && r.days_until <= self.settings.race_week_days
        };
        let target = races
            .iter()
            .filter(in_race_week)
            .find(|r| r.category == EventCategory::RaceA)
            .or_else(|| races.iter().find(in_race_week));

        let race_week = match target {
            Some(race) => RaceWeek::Active(Box::new(self.race_week(race, fitness, activities_7d, today))),
            None => RaceWeek::inactive(),
        };

        tracing::debug!(
            races = races.len(),
            taper = taper_alert.active,
            race_week = race_week.is_active(),
            "Race calendar built"
        );

        RaceCalendar {
            next_race: races.first().cloned(),
            all_races: races,
            taper_alert,
            race_week,
        }
    }

    pub fn race_week(
        &self,
        race: &RaceEntry,
        fitness: &FitnessSnapshot,
        activities_7d: &[ActivityRecord],
        today: NaiveDate,
    ) -> RaceWeekProtocol {
        let race_day = today
            .checked_add_days(Days::new(race.days_until.max(0) as u64))
            .unwrap_or(today);
        let days_before = |n: i64| race_day.checked_sub_days(Days::new(n as u64)).unwrap_or(race_day);

        let ctl = fitness.ctl.unwrap_or(0.0);
        let normal_weekly = round_dp(ctl * 7.0, 1);
        let (min_pct, max_pct) = budget_fractions(race.category);
        let budget = LoadBand::fraction_of(normal_weekly, min_pct, max_pct);

        let week_start = days_before(self.settings.race_week_days);
        let spent = round_whole(
            activities_7d
                .iter()
                .filter(|a| matches!(a.day(), Some(d) if d >= week_start && d <= today))
                .map(|a| a.load())
                .sum(),
        );

        let projected = fitness.project_tsb(race.days_until);
        let class = DurationClass::classify(race.moving_time_seconds, race.category);
        let target = class.tsb_target().for_category(race.category);

        let carb_applicable = match race.moving_time_seconds {
            Some(t) => t >= SHORT_EVENT_SECONDS,
            None => race.category == EventCategory::RaceA,
        };

        let go_no_go = self.go_no_go(projected, target);

        tracing::debug!(
            event = %race.name,
            day = %day_label(race.days_until),
            class = %class,
            projected_tsb = projected,
            "Race week active"
        );

        RaceWeekProtocol {
            active: true,
            event_name: race.name.clone(),
            event_date: race.date.clone(),
            event_category: race.category,
            event_type: race.event_type.clone(),
            event_duration_class: class,
            event_moving_time_seconds: race.moving_time_seconds,
            days_until_event: race.days_until,
            current_day: day_label(race.days_until),
            ctl_baseline: round_dp(ctl, 1),
            normal_weekly_tss: normal_weekly,
            race_week_tss_budget: budget,
            race_week_tss_spent: spent,
            race_week_tss_remaining: budget.remaining_after(spent),
            projected_race_day_tsb: projected,
            tsb_target_range: target,
            today: self.day_protocol(race.days_until, ctl, class),
            carb_loading: CarbLoading {
                applicable: carb_applicable,
                active: carb_applicable && race.days_until <= CARB_LOADING_START_DAY,
                starts: day_label(CARB_LOADING_START_DAY),
                start_date: days_before(CARB_LOADING_START_DAY),
                note: carb_applicable.then(|| CARB_LOADING_NOTE.to_string()),
            },
            opener: Opener {
                day: day_label(OPENER_DAY),
                date: days_before(OPENER_DAY),
                intensity: class.opener_intensity(),
            },
            go_no_go,
        }
    }

    /// Today's guidance; load targets are fractions of CTL
    pub fn day_protocol(&self, days_until: i64, ctl: f64, class: DurationClass) -> DayProtocol {
        let Some(template) = usize::try_from(days_until.max(0))
            .ok()
            .and_then(|d| DAY_TEMPLATES.get(d))
        else {
            return DayProtocol {
                label: "Pre-race-week".to_string(),
                load_target_tss: None,
                zones: "Normal training".to_string(),
                purpose: "Race week protocol not yet active for this day.".to_string(),
            };
        };

        let mut min_pct = template.min_pct;
        let mut zones = template.zones.to_string();
        let mut purpose = template.purpose.to_string();

        match (days_until, class) {
            (2, DurationClass::LongEndurance) => {
                zones = "3-4 efforts Z4 only (20-60s), moderate cadence, full recovery".to_string();
                purpose = "Light neuromuscular activation. Preserve glycogen.".to_string();
            }
            (2, DurationClass::ShortIntense) => {
                zones = "5-6 efforts Z4-Z6 (10-30s), high cadence, full recovery".to_string();
                purpose = "Full neuromuscular activation for short, intense effort.".to_string();
            }
            (3 | 4, DurationClass::LongEndurance) => {
                min_pct = 0.20;
                purpose.push_str(" Easy endurance preferred over complete rest for long events.");
            }
            _ => {}
        }

        DayProtocol {
            label: template.label.to_string(),
            load_target_tss: Some(LoadBand::fraction_of(ctl, min_pct, template.max_pct)),
            zones,
            purpose,
        }
    }

    fn go_no_go(&self, projected: f64, target: TsbRange) -> GoNoGo {
        let min = target.min as f64;
        if projected >= min {
            GoNoGo {
                tsb_status: TsbStatus::Green,
                notes: Vec::new(),
            }
        } else if projected >= min - self.settings.tsb_shortfall_band {
            GoNoGo {
                tsb_status: TsbStatus::Flag,
                notes: vec![format!(
                    "Projected race-day TSB {} is below target range {}. Consider additional rest.",
                    fmt_float(projected),
                    target
                )],
            }
        } else {
            GoNoGo {
                tsb_status: TsbStatus::Flag,
                notes: vec![format!(
                    "Projected race-day TSB {} is significantly below target range {}. \
                     Fatigue may impact performance.",
                    fmt_float(projected),
                    target
                )],
            }
        }
    }

    /// Taper-onset, race-week status and TSB shortfall alerts, all tier 1
    pub fn alerts(&self, calendar: &RaceCalendar) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if let TaperAlert {
            active: true,
            days_until,
            message,
            ..
        } = &calendar.taper_alert
        {
            alerts.push(Alert::new(
                "race_taper",
                days_until.map(AlertValue::from),
                Severity::Info,
                format!(
                    "RACE_A within {}-{} days",
                    self.settings.taper_window_min_days, self.settings.taper_window_max_days
                ),
                message.clone().unwrap_or_else(|| "Taper onset detected.".to_string()),
                1,
            ));
        }

        if let Some(week) = calendar.race_week.protocol() {
            let band = week.today.load_target_tss.unwrap_or(LoadBand { min: 0, max: 0 });
            alerts.push(Alert::new(
                "race_week",
                Some(week.days_until_event.into()),
                Severity::Info,
                format!(
                    "{} within {} days",
                    week.event_category, self.settings.race_week_days
                ),
                format!(
                    "Race week {} of '{}'. Today: {}, {}-{} TSS. {}",
                    week.current_day, week.event_name, week.today.label, band.min, band.max, week.today.zones
                ),
                1,
            ));

            let target = week.tsb_target_range;
            if week.projected_race_day_tsb < target.min as f64 {
                alerts.push(Alert::new(
                    "race_week_tsb",
                    Some(week.projected_race_day_tsb.into()),
                    Severity::Warning,
                    format!("TSB target {}", target),
                    format!(
                        "Projected race-day TSB {} is below target range {}. \
                         Consider additional rest to reach target.",
                        fmt_float(week.projected_race_day_tsb),
                        target
                    ),
                    1,
                ));
            }
        }

        alerts
    }
}

impl Default for RacePlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 20).unwrap()
    }

    fn race(date: &str, category: &str, moving_time: Option<f64>) -> EventRecord {
        serde_json::from_value(serde_json::json!({
            "date": date,
            "category": category,
            "name": "Gran Fondo",
            "type": "Ride",
            "moving_time": moving_time,
        }))
        .unwrap()
    }

    fn fitness(ctl: f64, atl: f64) -> FitnessSnapshot {
        FitnessSnapshot {
            ctl: Some(ctl),
            atl: Some(atl),
            tsb: Some(ctl - atl),
            ..FitnessSnapshot::default()
        }
    }

    fn ride(date: &str, load: f64) -> ActivityRecord {
        serde_json::from_value(serde_json::json!({
            "date": date,
            "type": "Ride",
            "training_load": load,
        }))
        .unwrap()
    }

    #[test]
    fn test_calendar_filters_and_sorts() {
        let events = vec![
            race("2024-10-30", "RACE_C", None),
            race("2024-09-25", "RACE_B", None),
            race("2024-09-19", "RACE_A", None),
            race("2025-01-30", "RACE_A", None),
            serde_json::from_value(serde_json::json!({"date": "2024-09-22", "category": "WORKOUT"})).unwrap(),
        ];
        let races = RacePlanner::new().race_entries(&events, today());
        let days: Vec<i64> = races.iter().map(|r| r.days_until).collect();
        assert_eq!(days, vec![5, 40]);
    }

    #[test]
    fn test_taper_alert_window() {
        let planner = RacePlanner::new();
        let cal = planner.calendar(&[race("2024-10-01", "RACE_A", None)], &fitness(60.0, 60.0), &[], today());
        assert!(cal.taper_alert.active);
        assert_eq!(cal.taper_alert.days_until, Some(11));
        assert!(!cal.race_week.is_active());

        let far = planner.calendar(&[race("2024-10-10", "RACE_A", None)], &fitness(60.0, 60.0), &[], today());
        assert!(!far.taper_alert.active);
        assert_eq!(far.next_race.unwrap().days_until, 20);
    }

    #[test]
    fn test_race_week_prefers_a_race() {
        let events = vec![race("2024-09-22", "RACE_B", None), race("2024-09-26", "RACE_A", None)];
        let cal = RacePlanner::new().calendar(&events, &fitness(60.0, 60.0), &[], today());
        let week = cal.race_week.protocol().unwrap();
        assert_eq!(week.event_category, EventCategory::RaceA);
        assert_eq!(week.current_day, "D-6");
    }

    #[test]
    fn test_d5_load_targets() {
        let planner = RacePlanner::new();
        let day = planner.day_protocol(5, 50.0, DurationClass::Medium);
        assert_eq!(day.label, "Moderate endurance");
        assert_eq!(day.load_target_tss, Some(LoadBand { min: 20, max: 30 }));
    }

    #[test]
    fn test_opener_and_long_event_adjustments() {
        let planner = RacePlanner::new();
        let long_opener = planner.day_protocol(2, 60.0, DurationClass::LongEndurance);
        assert!(long_opener.zones.starts_with("3-4 efforts Z4 only"));

        let long_d3 = planner.day_protocol(3, 60.0, DurationClass::LongEndurance);
        assert_eq!(long_d3.load_target_tss, Some(LoadBand { min: 12, max: 24 }));
        assert!(long_d3.purpose.ends_with("for long events."));

        let pre = planner.day_protocol(9, 60.0, DurationClass::Medium);
        assert_eq!(pre.label, "Pre-race-week");
        assert_eq!(pre.load_target_tss, None);
    }

    #[test]
    fn test_race_week_budget_and_projection() {
        let planner = RacePlanner::new();
        let events = vec![race("2024-09-25", "RACE_A", Some(4.0 * 3600.0))];
        let activities = vec![ride("2024-09-17", 100.0), ride("2024-09-18", 80.0), ride("2024-09-20", 40.0)];
        let cal = planner.calendar(&events, &fitness(60.0, 80.0), &activities, today());
        let week = cal.race_week.protocol().unwrap();

        assert_eq!(week.normal_weekly_tss, 420.0);
        assert_eq!(week.race_week_tss_budget, LoadBand { min: 168, max: 231 });
        // window opens 2024-09-18
        assert_eq!(week.race_week_tss_spent, 120);
        assert_eq!(week.race_week_tss_remaining, LoadBand { min: 48, max: 111 });
        assert_eq!(week.projected_race_day_tsb, 14.1);
        assert_eq!(week.event_duration_class, DurationClass::LongEndurance);
        assert_eq!(week.tsb_target_range, TsbRange { min: 10, max: 25 });
        assert_eq!(week.go_no_go.tsb_status, TsbStatus::Green);
        assert!(week.carb_loading.applicable);
        assert!(!week.carb_loading.active);
        assert_eq!(week.opener.intensity, OpenerIntensity::Lighter);
    }

    #[test]
    fn test_b_race_targets_and_flags() {
        let planner = RacePlanner::new();
        let events = vec![race("2024-09-23", "RACE_B", Some(3600.0))];
        let cal = planner.calendar(&events, &fitness(50.0, 90.0), &[], today());
        let week = cal.race_week.protocol().unwrap();

        assert_eq!(week.tsb_target_range, TsbRange { min: 0, max: 10 });
        assert_eq!(week.projected_race_day_tsb, -12.1);
        assert_eq!(week.go_no_go.tsb_status, TsbStatus::Flag);
        assert!(week.go_no_go.notes[0].contains("significantly below"));
        assert!(!week.carb_loading.applicable);
        assert_eq!(week.carb_loading.note, None);

        let alerts = planner.alerts(&cal);
        let metrics: Vec<&str> = alerts.iter().map(|a| a.metric.as_str()).collect();
        assert_eq!(metrics, vec!["race_week", "race_week_tsb"]);
        assert!(alerts.iter().all(|a| a.tier == 1));
    }

    #[test]
    fn test_inactive_race_week_serializes_as_marker() {
        let json = serde_json::to_value(RaceWeek::inactive()).unwrap();
        assert_eq!(json, serde_json::json!({"active": false}));

        let taper = serde_json::to_value(TaperAlert::default()).unwrap();
        assert_eq!(taper, serde_json::json!({"active": false}));
    }

    #[test]
    fn test_duration_class_defaults() {
        assert_eq!(DurationClass::classify(None, EventCategory::RaceA), DurationClass::LongEndurance);
        assert_eq!(DurationClass::classify(None, EventCategory::RaceB), DurationClass::Medium);
        assert_eq!(DurationClass::classify(Some(5400.0), EventCategory::RaceB), DurationClass::Medium);
        assert_eq!(DurationClass::classify(Some(10801.0), EventCategory::RaceB), DurationClass::LongEndurance);
    }
}
