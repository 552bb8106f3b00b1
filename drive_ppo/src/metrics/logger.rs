//! Per-iteration training report sinks.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::learner::UpdateStats;

/// Everything reported after one training iteration.
#[derive(Debug, Clone, Default)]
pub struct TrainingSnapshot {
    /// 1-based iteration index.
    pub iteration: usize,
    /// Cumulative environment steps.
    pub timesteps: usize,
    /// Run-average throughput: cumulative steps divided by wall time since
    /// training started (not the last iteration alone).
    pub fps: f32,
    /// Episodes completed since the start of training.
    pub episodes: usize,
    /// Mean reward over the last 100 episodes.
    pub avg_reward: f32,
    /// Mean length over the last 100 episodes.
    pub avg_length: f32,
    /// Averaged update losses.
    pub losses: UpdateStats,
}

impl TrainingSnapshot {
    pub fn new(iteration: usize, timesteps: usize, fps: f32) -> Self {
        Self {
            iteration,
            timesteps,
            fps,
            ..Self::default()
        }
    }

    /// Set episode statistics.
    pub fn with_episodes(mut self, episodes: usize, avg_reward: f32, avg_length: f32) -> Self {
        self.episodes = episodes;
        self.avg_reward = avg_reward;
        self.avg_length = avg_length;
        self
    }

    /// Set loss values.
    pub fn with_losses(mut self, losses: UpdateStats) -> Self {
        self.losses = losses;
        self
    }
}

/// Logger trait for different logging backends.
pub trait MetricsLogger: Send {
    /// Log a training snapshot.
    fn log(&mut self, snapshot: &TrainingSnapshot);

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Structured log line per iteration through `tracing`.
#[derive(Debug, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsLogger for TracingLogger {
    fn log(&mut self, s: &TrainingSnapshot) {
        info!(
            iteration = s.iteration,
            timesteps = s.timesteps,
            fps = s.fps as u64,
            episodes = s.episodes,
            avg_reward = s.avg_reward,
            avg_length = s.avg_length,
            policy_loss = s.losses.policy_loss,
            value_loss = s.losses.value_loss,
            entropy = s.losses.entropy,
            approx_kl = s.losses.approx_kl,
            clip_fraction = s.losses.clip_fraction,
            "iteration complete"
        );
    }

    fn flush(&mut self) {}
}

/// CSV progress file, one row per iteration.
pub struct CsvLogger {
    writer: BufWriter<File>,
}

impl CsvLogger {
    /// Column order of every row.
    pub const HEADER: &'static str = "iteration,timesteps,fps,episodes,avg_reward,avg_length,\
policy_loss,value_loss,entropy,approx_kl,clip_fraction";

    /// Create (or truncate) the CSV file and write the header.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", Self::HEADER)?;
        Ok(Self { writer })
    }
}

impl MetricsLogger for CsvLogger {
    fn log(&mut self, s: &TrainingSnapshot) {
        let _ = writeln!(
            self.writer,
            "{},{},{:.2},{},{:.4},{:.2},{:.6},{:.6},{:.6},{:.6},{:.4}",
            s.iteration,
            s.timesteps,
            s.fps,
            s.episodes,
            s.avg_reward,
            s.avg_length,
            s.losses.policy_loss,
            s.losses.value_loss,
            s.losses.entropy,
            s.losses.approx_kl,
            s.losses.clip_fraction,
        );
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CsvLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Fans each snapshot out to several loggers.
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self {
            loggers: Vec::new(),
        }
    }

    /// Add a logger.
    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl Default for MultiLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsLogger for MultiLogger {
    fn log(&mut self, snapshot: &TrainingSnapshot) {
        for logger in &mut self.loggers {
            logger.log(snapshot);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records iterations it was handed.
    struct Recording(Arc<Mutex<Vec<usize>>>);

    impl MetricsLogger for Recording {
        fn log(&mut self, snapshot: &TrainingSnapshot) {
            self.0.lock().unwrap().push(snapshot.iteration);
        }

        fn flush(&mut self) {}
    }

    fn snapshot(iteration: usize) -> TrainingSnapshot {
        TrainingSnapshot::new(iteration, iteration * 1024, 512.0)
            .with_episodes(3, -1.5, 700.0)
            .with_losses(UpdateStats {
                policy_loss: 0.1,
                value_loss: 0.2,
                entropy: 1.3,
                approx_kl: 0.01,
                clip_fraction: 0.05,
                minibatches: 4,
            })
    }

    #[test]
    fn test_training_snapshot() {
        let s = snapshot(2);
        assert_eq!(s.iteration, 2);
        assert_eq!(s.timesteps, 2048);
        assert_eq!(s.episodes, 3);
        assert!((s.avg_reward + 1.5).abs() < 1e-6);
        assert_eq!(s.losses.minibatches, 4);
    }

    #[test]
    fn test_csv_logger_writes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.csv");
        {
            let mut logger = CsvLogger::new(&path).unwrap();
            logger.log(&snapshot(1));
            logger.log(&snapshot(2));
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CsvLogger::HEADER);
        assert!(lines[1].starts_with("1,1024,512.00,3,-1.5000,700.00,"));
        assert_eq!(lines[2].split(',').count(), 11);
    }

    #[test]
    fn test_multi_logger_fans_out() {
        let seen_a = Arc::new(Mutex::new(Vec::new()));
        let seen_b = Arc::new(Mutex::new(Vec::new()));
        let mut multi = MultiLogger::new()
            .add(Recording(seen_a.clone()))
            .add(Recording(seen_b.clone()))
            .add(TracingLogger::new());
        assert_eq!(multi.len(), 3);

        multi.log(&snapshot(1));
        multi.log(&snapshot(2));
        multi.flush();

        assert_eq!(*seen_a.lock().unwrap(), vec![1, 2]);
        assert_eq!(*seen_b.lock().unwrap(), vec![1, 2]);
    }
}
