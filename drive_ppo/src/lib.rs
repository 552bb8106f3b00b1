//! # drive_ppo: Multi-Worker PPO for Continuous Driving Control
//!
//! Synchronous PPO with a squashed-Gaussian actor-critic, parallel rollout
//! workers on OS threads, and a single learner that owns the model.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        One PPO iteration                            │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  Learner thread                                                     │
//! │  ┌──────────────┐   snapshot bytes (cloned per worker)              │
//! │  │ ActorCritic  │───────────┬──────────────┬──────────────┐         │
//! │  │ + Adam       │           ▼              ▼              ▼         │
//! │  └──────▲───────┘     ┌──────────┐   ┌──────────┐   ┌──────────┐    │
//! │         │             │Worker 0  │   │Worker 1  │   │Worker N  │    │
//! │         │             │ env      │   │ env      │   │ env      │    │
//! │         │             │ model    │   │ model    │   │ model    │    │
//! │         │             └────┬─────┘   └────┬─────┘   └────┬─────┘    │
//! │         │                  └──────────────┼──────────────┘          │
//! │         │                                 ▼                         │
//! │         │                     crossbeam channel (deadline)          │
//! │         │                                 ▼                         │
//! │   PPO epochs ◄──── Batch ◄──── GAE per trajectory                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use drive_ppo::{MockEnv, PpoTrainer, TrainConfig, TracingLogger};
//!
//! let config = TrainConfig::new()
//!     .with_num_workers(4)
//!     .with_steps_per_worker(256)
//!     .build()?;
//!
//! let trainer = PpoTrainer::<Autodiff<NdArray>>::new(config, Default::default())?;
//! let model_config = trainer.model_config(&MockEnv::driving_like(700));
//! let model = trainer.init_model(&model_config);
//! let outcome = trainer.run(&model_config, model, |_| Ok(MockEnv::driving_like(700)), &mut TracingLogger::new())?;
//! ```

pub mod algorithms;
pub mod checkpoint;
pub mod config;
pub mod environment;
pub mod error;
pub mod learner;
pub mod metrics;
pub mod model;
pub mod nn;
pub mod rollout;
pub mod trainer;

pub use checkpoint::{load_checkpoint, CheckpointError, Checkpointer};
pub use config::{ConfigError, DevicePreference, TrainConfig};
pub use environment::{
    BoxSpace, EnvError, EnvInfo, Environment, MockEnv, ObservationSpace, StepOutcome,
};
pub use error::{Result, TrainError};
pub use learner::{Batch, BatchBuilder, UpdateStats};
pub use metrics::{CsvLogger, EpisodeStats, MetricsLogger, MultiLogger, TracingLogger, TrainingSnapshot};
pub use model::{ActorCritic, ActorCriticConfig};
pub use rollout::{evaluate_policy, EpisodeResult, ModelSnapshot, Trajectory};
pub use trainer::{PpoTrainer, TrainingOutcome};
