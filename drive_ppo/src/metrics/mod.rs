//! Training metrics and reporting.
//!
//! ## Statistics
//!
//! - [`EpisodeStats`]: Reward and length of the last 100 completed episodes
//!
//! ## Loggers
//!
//! - [`TracingLogger`]: Structured `tracing` line per iteration
//! - [`CsvLogger`]: CSV progress file for analysis
//! - [`MultiLogger`]: Combine multiple loggers

pub mod episode_stats;
pub mod logger;

pub use episode_stats::{EpisodeStats, EPISODE_WINDOW};
pub use logger::{CsvLogger, MetricsLogger, MultiLogger, TracingLogger, TrainingSnapshot};
