//! Readiness engine
//!
//! Ties the calculators together into one pure run over a training snapshot.
//! The evaluation instant is passed in, so identical inputs always produce an
//! identical report.

use crate::alerts::{sort_alerts, Alert, AlertEngine, Severity};
use crate::baseline::BaselineCalculator;
use crate::benchmark::{BenchmarkBlock, EquipmentContext, Season, ThresholdHistory};
use crate::config::{EngineConfig, WindowSettings};
use crate::fitness::{FitnessSnapshot, PowerModel};
use crate::load::{LoadAggregator, ZoneDistribution};
use crate::metrics::{
    interpret_acwr, interpret_monotony, Capability, DataQuality, DerivedMetrics, MetricCalculator,
    GREY_ZONE_NOTE, HARD_DAYS_NOTE, POLARISATION_NOTE, QUALITY_INTENSITY_NOTE,
};
use crate::models::{window_start, ActivityRecord, EventRecord, TrainingSnapshot, WellnessRecord};
use crate::phase::{PhaseDetector, PhaseInputs};
use crate::race::{RaceCalendar, RacePlanner};
use crate::stats::round_dp;
use crate::summary::{ActivitySummary, QuickStats, WeeklySummary};
use crate::tid::{SeilerTid, TidComparison};
use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Records of one snapshot split into the engine's evaluation windows
#[derive(Debug, Clone, Default)]
pub struct Windows {
    pub activities_7d: Vec<ActivityRecord>,
    pub activities_28d: Vec<ActivityRecord>,
    pub wellness_7d: Vec<WellnessRecord>,
    pub wellness_28d: Vec<WellnessRecord>,
    /// Events in the acute window up to and including today
    pub past_events: Vec<EventRecord>,
    /// Events from today through the race horizon
    pub future_events: Vec<EventRecord>,
}

impl Windows {
    /// Records with an unparseable date are left out of every window.
    /// Wellness is ordered oldest first so the last record is the latest.
    pub fn split(snapshot: &TrainingSnapshot, today: NaiveDate, settings: &WindowSettings) -> Self {
        let acute_start = window_start(today, settings.acute_days);
        let chronic_start = window_start(today, settings.chronic_days);
        let horizon_end = today
            .checked_add_days(Days::new(settings.race_horizon_days as u64))
            .unwrap_or(today);

        let within = |day: Option<NaiveDate>, start: NaiveDate, end: NaiveDate| {
            matches!(day, Some(d) if d >= start && d <= end)
        };

        let activities_in = |start: NaiveDate| -> Vec<ActivityRecord> {
            snapshot
                .activities
                .iter()
                .filter(|a| within(a.day(), start, today))
                .cloned()
                .collect()
        };
        let wellness_in = |start: NaiveDate| -> Vec<WellnessRecord> {
            let mut days: Vec<WellnessRecord> = snapshot
                .wellness
                .iter()
                .filter(|w| within(w.day(), start, today))
                .cloned()
                .collect();
            days.sort_by_key(|w| w.day());
            days
        };
        let events_in = |start: NaiveDate, end: NaiveDate| -> Vec<EventRecord> {
            snapshot
                .events
                .iter()
                .filter(|e| within(e.day(), start, end))
                .cloned()
                .collect()
        };

        let windows = Windows {
            activities_7d: activities_in(acute_start),
            activities_28d: activities_in(chronic_start),
            wellness_7d: wellness_in(acute_start),
            wellness_28d: wellness_in(chronic_start),
            past_events: events_in(acute_start, today),
            future_events: events_in(today, horizon_end),
        };

        tracing::debug!(
            activities_7d = windows.activities_7d.len(),
            activities_28d = windows.activities_28d.len(),
            wellness_7d = windows.wellness_7d.len(),
            past_events = windows.past_events.len(),
            future_events = windows.future_events.len(),
            "Split snapshot into windows"
        );
        windows
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub athlete_id: Option<String>,
    pub last_updated: String,
    pub data_range_days: u32,
    pub extended_range_days: u32,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub ftp_outdoor: Option<u32>,
    pub ftp_indoor: Option<u32>,
    pub eftp: Option<f64>,
    pub lthr: Option<u32>,
    pub max_hr: Option<u32>,
    pub w_prime: Option<f64>,
    pub w_prime_kj: Option<f64>,
    pub p_max: Option<f64>,
    pub vo2max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    pub weight_kg: Option<f64>,
    pub resting_hr: Option<f64>,
    pub hrv: Option<f64>,
    pub sleep_quality: Option<f64>,
    pub sleep_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStatus {
    pub fitness: FitnessSnapshot,
    pub thresholds: Thresholds,
    pub current_metrics: CurrentMetrics,
}

/// Everything one run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub quick_stats: QuickStats,
    pub metadata: ReportMetadata,
    pub alerts: Vec<Alert>,
    pub summary: ActivitySummary,
    pub current_status: CurrentStatus,
    pub derived_metrics: DerivedMetrics,
    pub weekly_summary: WeeklySummary,
    pub race_calendar: RaceCalendar,
    /// Threshold history after this run's readings were recorded
    pub ftp_history: ThresholdHistory,
}

impl ReadinessReport {
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.alerts.iter().filter(|a| a.severity == severity).count()
    }
}

pub struct ReadinessEngine {
    config: EngineConfig,
    aggregator: LoadAggregator,
    baselines: BaselineCalculator,
    metrics: MetricCalculator,
    phases: PhaseDetector,
    alerts: AlertEngine,
    races: RacePlanner,
}

impl ReadinessEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        ReadinessEngine {
            aggregator: LoadAggregator::new(),
            baselines: BaselineCalculator::with_config(config.hrv.clone()),
            metrics: MetricCalculator::with_config(&config),
            phases: PhaseDetector::with_config(config.phase.clone()),
            alerts: AlertEngine::with_config(&config),
            races: RacePlanner::with_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate `snapshot` as of `as_of`, recording today's thresholds into
    /// `history` and returning it inside the report
    pub fn run(
        &self,
        snapshot: &TrainingSnapshot,
        mut history: ThresholdHistory,
        as_of: NaiveDateTime,
    ) -> ReadinessReport {
        let today = as_of.date();
        let timestamp = as_of.format("%Y-%m-%dT%H:%M:%S%.f").to_string();
        let windows = Windows::split(snapshot, today, &self.config.windows);

        let fitness = FitnessSnapshot::resolve(
            today,
            snapshot.wellness_today.as_ref(),
            snapshot.wellness_yesterday.as_ref(),
            &snapshot.events,
            &windows.activities_7d,
        );

        let profile = &snapshot.profile;
        history.record(EquipmentContext::Indoor, today, profile.ftp_indoor);
        history.record(EquipmentContext::Outdoor, today, profile.ftp_outdoor);

        let derived = self.derive_metrics(snapshot, &windows, &fitness, &history, today, timestamp.clone());

        let mut alerts = self.alerts.evaluate(&derived, &windows.wellness_7d);
        let race_calendar = self.races.calendar(
            &windows.future_events,
            &fitness,
            &windows.activities_7d,
            today,
        );
        alerts.extend(self.races.alerts(&race_calendar));
        sort_alerts(&mut alerts);

        let report = ReadinessReport {
            quick_stats: QuickStats::compute(&windows.activities_7d),
            metadata: ReportMetadata {
                athlete_id: profile.athlete_id.clone(),
                last_updated: timestamp,
                data_range_days: self.config.windows.acute_days,
                extended_range_days: self.config.windows.chronic_days,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            alerts,
            summary: ActivitySummary::compute(&windows.activities_7d, self.config.windows.acute_days),
            current_status: CurrentStatus {
                thresholds: Thresholds {
                    ftp_outdoor: profile.ftp_outdoor,
                    ftp_indoor: profile.ftp_indoor,
                    eftp: derived.eftp,
                    lthr: profile.lthr,
                    max_hr: profile.max_hr,
                    w_prime: derived.w_prime,
                    w_prime_kj: derived.w_prime_kj,
                    p_max: derived.p_max,
                    vo2max: derived.vo2max,
                },
                current_metrics: current_metrics(snapshot, windows.wellness_7d.last()),
                fitness,
            },
            weekly_summary: WeeklySummary::compute(&windows.activities_7d, &windows.wellness_7d, &self.baselines),
            derived_metrics: derived,
            race_calendar,
            ftp_history: history,
        };

        tracing::info!(
            date = %today,
            alerts = report.alerts.len(),
            alarms = report.count_severity(Severity::Alarm),
            warnings = report.count_severity(Severity::Warning),
            phase = %report.derived_metrics.phase_detected,
            race_week = report.race_calendar.race_week.is_active(),
            taper = report.race_calendar.taper_alert.active,
            "Readiness evaluated"
        );

        report
    }

    /// Compute every derived metric for one evaluation date
    pub fn derive_metrics(
        &self,
        snapshot: &TrainingSnapshot,
        windows: &Windows,
        fitness: &FitnessSnapshot,
        history: &ThresholdHistory,
        today: NaiveDate,
        calculation_timestamp: String,
    ) -> DerivedMetrics {
        let settings = &self.config.windows;
        let acts_7d = &windows.activities_7d;
        let acts_28d = &windows.activities_28d;
        let m = &self.metrics;

        // Load
        let daily_7d = self.aggregator.daily_series(acts_7d, today, settings.acute_days);
        let daily_28d = self.aggregator.daily_series(acts_28d, today, settings.chronic_days);
        let tss_7d: f64 = daily_7d.iter().sum();
        let tss_28d: f64 = daily_28d.iter().sum();

        let acwr = m.acwr(&daily_7d, &daily_28d);
        let monotony = m.monotony(&daily_7d);

        let by_family = self.aggregator.family_series(acts_7d, today, settings.acute_days);
        let primary = m.primary_sport(&by_family);
        let multi_sport = by_family.len() > 1;
        let primary_monotony = primary.as_ref().and_then(|p| p.monotony);
        let effective_monotony = m.effective_monotony(monotony, primary_monotony, multi_sport);
        let strain = m.strain(tss_7d, monotony);

        // Readiness
        let base_7d = self.baselines.baselines(&windows.wellness_7d);
        let base_28d = self.baselines.baselines(&windows.wellness_28d);
        let latest_hrv = self.baselines.latest_hrv(&windows.wellness_7d);
        let latest_rhr = self.baselines.latest_rhr(&windows.wellness_7d);
        let recovery_index = m.recovery_index(latest_hrv, base_7d.hrv, latest_rhr, base_7d.rhr);

        // Zones and intensity distribution
        let zones_7d = self.aggregator.zone_totals(acts_7d, None);
        let quality = m.quality_intensity_percentage(&zones_7d);
        let hard_days = self.aggregator.hard_days(acts_7d);

        let primary_family = primary.as_ref().map(|p| p.family);
        let seiler = |activities: &[ActivityRecord]| {
            let all = SeilerTid::from_totals(&self.aggregator.zone_totals(activities, None));
            let by_primary = primary_family.map(|family| {
                SeilerTid::from_totals(&self.aggregator.zone_totals(activities, Some(family))).for_sport(family)
            });
            (all, by_primary)
        };
        let (tid_7d, tid_7d_primary) = seiler(acts_7d.as_slice());
        let (tid_28d, tid_28d_primary) = seiler(acts_28d.as_slice());
        let tid_comparison = TidComparison::compare(&tid_7d, &tid_28d);

        let (consistency_index, consistency_details) = m.consistency(acts_7d, &windows.past_events);

        let phase = self.phases.detect(&PhaseInputs {
            acwr,
            recovery_index,
            quality_intensity_pct: quality,
            hard_days,
            strain,
            monotony,
            tsb: fitness.tsb,
            ctl: fitness.ctl,
        });

        let season = Season::from_date(today);
        let profile = &snapshot.profile;
        let power = PowerModel::from_wellness(snapshot.wellness_today.as_ref());
        let vo2max = snapshot
            .wellness_today
            .as_ref()
            .and_then(|w| w.vo2max)
            .or(profile.vo2max);

        DerivedMetrics {
            recovery_index,
            hrv_baseline_7d: base_7d.hrv,
            rhr_baseline_7d: base_7d.rhr,
            hrv_baseline_28d: base_28d.hrv,
            rhr_baseline_28d: base_28d.rhr,
            latest_hrv,
            latest_rhr,

            acwr,
            acwr_interpretation: interpret_acwr(acwr),
            monotony,
            monotony_interpretation: interpret_monotony(monotony, effective_monotony, multi_sport),
            primary_sport: primary_family,
            primary_sport_monotony: primary_monotony,
            primary_sport_tss_7d: primary.as_ref().map(|p| p.total_load),
            effective_monotony,
            multi_sport_detected: multi_sport,
            strain,
            stress_tolerance: m.stress_tolerance(strain, monotony),
            load_recovery_ratio: m.load_recovery_ratio(tss_7d, recovery_index),
            tss_7d_total: round_dp(tss_7d, 0),
            tss_28d_total: round_dp(tss_28d, 0),

            zone_distribution_7d: ZoneDistribution::from(&zones_7d),
            grey_zone_percentage: m.grey_zone_percentage(&zones_7d),
            grey_zone_note: GREY_ZONE_NOTE.to_string(),
            quality_intensity_percentage: quality,
            quality_intensity_note: QUALITY_INTENSITY_NOTE.to_string(),
            polarisation_index: m.polarisation_index(&zones_7d),
            polarisation_note: POLARISATION_NOTE.to_string(),
            hard_days_this_week: hard_days,
            hard_days_note: HARD_DAYS_NOTE.to_string(),

            seiler_tid_7d: tid_7d,
            seiler_tid_7d_primary: tid_7d_primary,
            seiler_tid_28d: tid_28d,
            seiler_tid_28d_primary: tid_28d_primary,

            capability: Capability {
                durability: m.durability(acts_7d, acts_28d),
                tid_comparison,
            },

            consistency_index,
            consistency_details,

            phase_detected: phase.phase,
            phase_triggers: phase.triggers,
            seasonal_context: season,

            benchmark_indoor: BenchmarkBlock::evaluate(
                EquipmentContext::Indoor,
                profile.ftp_indoor,
                history,
                today,
                season,
            ),
            benchmark_outdoor: BenchmarkBlock::evaluate(
                EquipmentContext::Outdoor,
                profile.ftp_outdoor,
                history,
                today,
                season,
            ),

            eftp: power.eftp,
            w_prime: power.w_prime,
            w_prime_kj: power.w_prime_kj,
            p_max: power.p_max,
            power_model_source: power.source,

            vo2max,

            calculation_timestamp,
            data_quality: DataQuality {
                hrv_data_points: base_7d.hrv_points,
                rhr_data_points: base_7d.rhr_points,
                activities_7d: acts_7d.len(),
                activities_28d: acts_28d.len(),
                planned_workouts_7d: windows.past_events.len(),
                ftp_history_days: history.span(),
            },
        }
    }
}

impl Default for ReadinessEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest wellness reading, falling back to the profile for weight and RHR
fn current_metrics(snapshot: &TrainingSnapshot, latest: Option<&WellnessRecord>) -> CurrentMetrics {
    let present = |v: Option<f64>| v.filter(|x| *x != 0.0);
    let profile = &snapshot.profile;

    CurrentMetrics {
        weight_kg: present(latest.and_then(|w| w.weight)).or(profile.weight),
        resting_hr: present(latest.and_then(|w| w.resting_hr)).or(profile.resting_hr),
        hrv: latest.and_then(|w| w.hrv),
        sleep_quality: latest.and_then(|w| w.sleep_quality),
        sleep_hours: present(latest.and_then(|w| w.sleep_secs)).map(|s| round_dp(s / 3600.0, 2)),
    }
}
