use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use trainload::alerts::{Alert, Severity};
use trainload::benchmark::ThresholdHistory;
use trainload::config::EngineConfig;
use trainload::engine::{ReadinessEngine, ReadinessReport};
use trainload::error::TrainLoadError;
use trainload::logging::{init_logging, LogConfig};
use trainload::models::{parse_day, TrainingSnapshot};

/// TrainLoad - training load and readiness analytics
///
/// Reads a snapshot of activities, wellness and calendar events and produces
/// derived load metrics, graduated alerts and race-week guidance.
#[derive(Parser)]
#[command(name = "trainload")]
#[command(version)]
#[command(about = "Training load and readiness analytics", long_about = None)]
struct Cli {
    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a training snapshot and write the readiness report
    Analyze {
        /// Snapshot JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Threshold history JSON file, updated in place
        #[arg(long)]
        history: Option<PathBuf>,

        /// Report output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Evaluation date (YYYY-MM-DD), defaults to now
        #[arg(short, long)]
        date: Option<String>,

        /// Engine config file (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print an alert summary table
        #[arg(short, long)]
        summary: bool,
    },

    /// Show or initialise the engine configuration
    Config {
        /// Write the default config to the user config directory
        #[arg(long)]
        init: bool,
    },
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Tier")]
    tier: u8,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Context")]
    context: String,
}

impl From<&Alert> for AlertRow {
    fn from(alert: &Alert) -> Self {
        AlertRow {
            tier: alert.tier,
            severity: alert.severity.to_string(),
            metric: alert.metric.clone(),
            value: alert
                .value
                .as_ref()
                .map_or_else(|| "-".to_string(), |v| v.to_string()),
            context: alert.context.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose))?;

    match cli.command {
        Commands::Analyze {
            input,
            history,
            output,
            date,
            config,
            summary,
        } => analyze(&input, history.as_deref(), output.as_deref(), date, config.as_deref(), summary),
        Commands::Config { init } => show_config(init),
    }
}

fn evaluation_instant(date: Option<String>) -> Result<NaiveDateTime> {
    match date {
        Some(value) => {
            let day: NaiveDate = parse_day(&value)
                .filter(|_| value.len() == 10)
                .ok_or(TrainLoadError::InvalidDate { value })?;
            Ok(day.and_time(Local::now().time()))
        }
        None => Ok(Local::now().naive_local()),
    }
}

fn analyze(
    input: &Path,
    history_path: Option<&Path>,
    output: Option<&Path>,
    date: Option<String>,
    config_path: Option<&Path>,
    summary: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::load_or_default(),
    };

    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read snapshot {}", input.display()))?;
    let snapshot: TrainingSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("Snapshot {} is not valid JSON", input.display()))?;

    let history = match history_path {
        Some(path) => ThresholdHistory::load(path)
            .with_context(|| format!("Failed to read threshold history {}", path.display()))?,
        None => ThresholdHistory::default(),
    };

    let as_of = evaluation_instant(date)?;
    let report = ReadinessEngine::with_config(config).run(&snapshot, history, as_of);

    if let Some(path) = history_path {
        report
            .ftp_history
            .save(path)
            .with_context(|| format!("Failed to write threshold history {}", path.display()))?;
    }

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
            eprintln!("{} {}", "✓ Report written to".green(), path.display());
        }
        None => println!("{}", json),
    }

    if summary {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &ReadinessReport) {
    let dm = &report.derived_metrics;
    let fitness = &report.current_status.fitness;
    let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| x.to_string());

    eprintln!("{}", "Readiness summary".bold());
    eprintln!(
        "  CTL {}  ATL {}  TSB {}",
        show(fitness.ctl),
        show(fitness.atl),
        show(fitness.tsb)
    );
    eprintln!(
        "  ACWR {}  Monotony {}  RI {}  Phase {}",
        show(dm.acwr),
        show(dm.effective_monotony),
        show(dm.recovery_index),
        dm.phase_detected
    );

    if let Some(week) = report.race_calendar.race_week.protocol() {
        eprintln!(
            "  {} {} of '{}': {}",
            "Race week".magenta().bold(),
            week.current_day,
            week.event_name,
            week.today.label
        );
    } else if let Some(race) = &report.race_calendar.next_race {
        eprintln!("  Next race: '{}' in {} days", race.name, race.days_until);
    }

    if report.alerts.is_empty() {
        eprintln!("{}", "✓ No alerts".green());
        return;
    }

    let rows: Vec<AlertRow> = report.alerts.iter().map(AlertRow::from).collect();
    eprintln!("{}", Table::new(rows).with(Style::rounded()));

    let alarms = report.count_severity(Severity::Alarm);
    let warnings = report.count_severity(Severity::Warning);
    let line = format!("{} alarm, {} warning", alarms, warnings);
    if alarms > 0 {
        eprintln!("{}", line.red().bold());
    } else if warnings > 0 {
        eprintln!("{}", line.yellow());
    } else {
        eprintln!("{}", line.dimmed());
    }
}

fn show_config(init: bool) -> Result<()> {
    let config = EngineConfig::default();
    if init {
        let path = EngineConfig::default_config_path();
        if path.exists() {
            eprintln!("{} {}", "Config already exists at".yellow(), path.display());
            return Ok(());
        }
        config
            .save_to_file(&path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        eprintln!("{} {}", "✓ Config written to".green(), path.display());
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}
