//! Training configuration.
//!
//! A [`TrainConfig`] is built once at startup (from CLI flags or code),
//! validated, and then only read. Every component receives the values it
//! needs from it; nothing mutates it during training.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration validation error.
///
/// Returned when configuration parameters are invalid or inconsistent.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter (num_workers, steps_per_worker, etc.) must be positive.
    InvalidCount {
        field: &'static str,
        value: usize,
    },
    /// A parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// The timestep budget does not cover a single iteration.
    InsufficientTimesteps {
        total_timesteps: usize,
        batch_size: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            ConfigError::OutOfRange {
                field,
                value,
                min,
                max,
            } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            ConfigError::InsufficientTimesteps {
                total_timesteps,
                batch_size,
            } => {
                write!(
                    f,
                    "total_timesteps ({}) must be >= num_workers * steps_per_worker ({})",
                    total_timesteps, batch_size
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where the learner should run.
///
/// Resolved exactly once by the caller into a concrete burn device and
/// passed to the [`PpoTrainer`](crate::trainer::PpoTrainer) explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Use an accelerator when one is compiled in, otherwise the CPU.
    #[default]
    Auto,
    /// Always use the CPU backend.
    Cpu,
    /// Require an accelerator backend.
    Accelerator,
}

/// Configuration for multi-worker PPO training.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    // Environment
    /// Scenario identifier (a scenario file path; its stem names checkpoints)
    pub scenario: String,

    // Rollout settings
    /// Number of parallel rollout workers per iteration
    pub num_workers: usize,
    /// Total environment steps budget
    pub total_timesteps: usize,
    /// Steps collected by each worker per iteration
    pub steps_per_worker: usize,

    // PPO settings
    /// Optimization epochs per iteration
    pub num_epochs: usize,
    /// Transitions per minibatch
    pub minibatch_size: usize,
    /// Discount factor
    pub gamma: f32,
    /// GAE lambda parameter
    pub gae_lambda: f32,
    /// PPO clipping ratio
    pub clip_epsilon: f32,
    /// Learning rate
    pub learning_rate: f64,
    /// Entropy bonus coefficient
    pub entropy_coef: f32,
    /// Value function loss coefficient
    pub value_loss_coef: f32,
    /// Gradient norm clipping threshold
    pub max_grad_norm: f32,

    // Model
    /// Width of the two shared hidden layers
    pub hidden_dim: usize,

    // Run settings
    /// Base random seed
    pub seed: u64,
    /// Directory for checkpoints
    pub model_dir: PathBuf,
    /// Iterations between checkpoint writes
    pub checkpoint_interval: usize,
    /// Upper bound on how long the learner waits for all workers
    pub worker_timeout: Duration,
    /// Learner device preference
    pub device: DevicePreference,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            scenario: "idm.scenic".to_string(),

            num_workers: 4,
            total_timesteps: 1_000_000,
            steps_per_worker: 256,

            num_epochs: 4,
            minibatch_size: 6,
            gamma: 0.9,
            gae_lambda: 0.9,
            clip_epsilon: 0.2,
            learning_rate: 3e-4,
            entropy_coef: 0.01,
            value_loss_coef: 0.5,
            max_grad_norm: 0.5,

            hidden_dim: 64,

            seed: 4,
            model_dir: PathBuf::from("models"),
            checkpoint_interval: 1,
            worker_timeout: Duration::from_secs(600),
            device: DevicePreference::Auto,
        }
    }
}

impl TrainConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transitions per iteration (all workers × steps per worker).
    pub fn batch_size(&self) -> usize {
        self.num_workers * self.steps_per_worker
    }

    /// Number of PPO iterations the timestep budget allows.
    pub fn num_iterations(&self) -> usize {
        let batch_size = self.batch_size();
        if batch_size == 0 {
            0
        } else {
            self.total_timesteps / batch_size
        }
    }

    /// Scenario name used for checkpoint naming: the file stem of `scenario`.
    pub fn scenario_name(&self) -> String {
        Path::new(&self.scenario)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.scenario.clone())
    }

    /// Base seed handed to every worker of a 1-based iteration.
    ///
    /// Each worker adds its own id on top of this value.
    pub fn iteration_seed(&self, iteration: usize) -> u64 {
        self.seed
            .wrapping_add((iteration as u64).wrapping_mul(self.num_workers as u64))
    }

    /// Validate all configuration parameters.
    ///
    /// # Validation Rules
    /// - Count parameters must be > 0
    /// - gamma and gae_lambda must be in [0.0, 1.0]
    /// - clip_epsilon must be in (0.0, 1.0]
    /// - learning_rate and max_grad_norm must be positive
    /// - the timestep budget must cover at least one iteration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("num_workers", self.num_workers),
            ("steps_per_worker", self.steps_per_worker),
            ("num_epochs", self.num_epochs),
            ("minibatch_size", self.minibatch_size),
            ("hidden_dim", self.hidden_dim),
            ("checkpoint_interval", self.checkpoint_interval),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::InvalidCount { field, value });
            }
        }

        check_range("gamma", self.gamma as f64, 0.0, 1.0)?;
        check_range("gae_lambda", self.gae_lambda as f64, 0.0, 1.0)?;
        if self.clip_epsilon <= 0.0 || self.clip_epsilon > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "clip_epsilon",
                value: self.clip_epsilon as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "learning_rate",
                value: self.learning_rate,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        if !(self.max_grad_norm > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "max_grad_norm",
                value: self.max_grad_norm as f64,
                min: 0.0,
                max: f64::INFINITY,
            });
        }

        let batch_size = self.batch_size();
        if self.total_timesteps < batch_size {
            return Err(ConfigError::InsufficientTimesteps {
                total_timesteps: self.total_timesteps,
                batch_size,
            });
        }

        Ok(())
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    // Builder methods

    /// Set the scenario identifier.
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = scenario.into();
        self
    }

    /// Set number of rollout workers.
    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    /// Set the total timestep budget.
    pub fn with_total_timesteps(mut self, n: usize) -> Self {
        self.total_timesteps = n;
        self
    }

    /// Set steps collected per worker per iteration.
    pub fn with_steps_per_worker(mut self, n: usize) -> Self {
        self.steps_per_worker = n;
        self
    }

    /// Set optimization epochs per iteration.
    pub fn with_num_epochs(mut self, n: usize) -> Self {
        self.num_epochs = n;
        self
    }

    /// Set minibatch size.
    pub fn with_minibatch_size(mut self, n: usize) -> Self {
        self.minibatch_size = n;
        self
    }

    /// Set discount factor.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set GAE lambda.
    pub fn with_gae_lambda(mut self, lambda: f32) -> Self {
        self.gae_lambda = lambda;
        self
    }

    /// Set PPO clip ratio.
    pub fn with_clip_epsilon(mut self, eps: f32) -> Self {
        self.clip_epsilon = eps;
        self
    }

    /// Set learning rate.
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set entropy coefficient.
    pub fn with_entropy_coef(mut self, coef: f32) -> Self {
        self.entropy_coef = coef;
        self
    }

    /// Set value loss coefficient.
    pub fn with_value_loss_coef(mut self, coef: f32) -> Self {
        self.value_loss_coef = coef;
        self
    }

    /// Set gradient clipping norm.
    pub fn with_max_grad_norm(mut self, norm: f32) -> Self {
        self.max_grad_norm = norm;
        self
    }

    /// Set hidden layer width.
    pub fn with_hidden_dim(mut self, dim: usize) -> Self {
        self.hidden_dim = dim;
        self
    }

    /// Set base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set checkpoint directory.
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Set iterations between checkpoint writes.
    pub fn with_checkpoint_interval(mut self, n: usize) -> Self {
        self.checkpoint_interval = n;
        self
    }

    /// Set the worker gather timeout.
    pub fn with_worker_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = timeout;
        self
    }

    /// Set the device preference.
    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value < min || value > max || value.is_nan() {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
