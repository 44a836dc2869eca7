// Library interface for TrainLoad modules
// The binary and integration tests drive everything through these

pub mod alerts;
pub mod baseline;
pub mod benchmark;
pub mod config;
pub mod engine;
pub mod error;
pub mod fitness;
pub mod load;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod phase;
pub mod race;
pub mod stats;
pub mod summary;
pub mod tid;

// Re-export commonly used types for convenience
pub use alerts::{Alert, AlertEngine, AlertValue, Severity};
pub use baseline::BaselineCalculator;
pub use benchmark::{EquipmentContext, ThresholdHistory};
pub use config::EngineConfig;
pub use engine::{ReadinessEngine, ReadinessReport};
pub use error::{Result, TrainLoadError};
pub use load::LoadAggregator;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{DerivedMetrics, MetricCalculator};
pub use models::*;
pub use phase::{Phase, PhaseDetector};
pub use race::{RaceCalendar, RacePlanner, RaceWeek};
pub use tid::{SeilerTid, TidClass};
