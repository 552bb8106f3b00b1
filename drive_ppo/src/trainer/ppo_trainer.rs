//! Synchronous multi-worker PPO training loop.
//!
//! ```text
//! ┌──────────────────────────── iteration k ─────────────────────────────┐
//! │ model.valid() → snapshot bytes                                        │
//! │        ├─→ rollout-worker-0 ─┐                                        │
//! │        ├─→ rollout-worker-1 ─┤  crossbeam channel (bounded wait)      │
//! │        └─→ rollout-worker-N ─┘                                        │
//! │ trajectories (sorted by worker id)                                    │
//! │        → GAE per trajectory → Batch → PPO epochs → model              │
//! │        → report → checkpoint                                          │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The learner model and optimizer never leave this thread. Workers only
//! ever see serialized copies of the weights.

use std::path::PathBuf;
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{info, warn};

use crate::checkpoint::Checkpointer;
use crate::config::TrainConfig;
use crate::environment::{EnvError, Environment};
use crate::error::Result;
use crate::learner::{ppo_update, BatchBuilder, UpdateStats};
use crate::metrics::{EpisodeStats, MetricsLogger, TrainingSnapshot};
use crate::model::{ActorCritic, ActorCriticConfig};
use crate::rollout::{collect_rollouts, ModelSnapshot, WorkerTask};

/// Result of a completed training run.
#[derive(Debug)]
pub struct TrainingOutcome<B: AutodiffBackend> {
    /// Trained model
    pub model: ActorCritic<B>,
    /// Trailing episode statistics at the end of training
    pub episodes: EpisodeStats,
    pub iterations: usize,
    /// Environment steps collected
    pub timesteps: usize,
    /// Losses of the final update
    pub last_update: UpdateStats,
    /// Final checkpoint file
    pub checkpoint: PathBuf,
}

/// Owns the configuration and the learner device for one training run.
#[derive(Debug, Clone)]
pub struct PpoTrainer<B: AutodiffBackend> {
    config: TrainConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> PpoTrainer<B> {
    /// Create a trainer after validating `config`.
    pub fn new(config: TrainConfig, device: B::Device) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, device })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Model architecture matching an environment's declared spaces.
    pub fn model_config<E: Environment>(&self, env: &E) -> ActorCriticConfig {
        let action_space = env.action_space();
        ActorCriticConfig::new(
            env.observation_space().flat_dim(),
            action_space.low.clone(),
            action_space.high.clone(),
        )
        .with_hidden_dim(self.config.hidden_dim)
    }

    /// Fresh model with weights derived from the configured seed.
    pub fn init_model(&self, model_config: &ActorCriticConfig) -> ActorCritic<B> {
        model_config.init::<B>(&self.device, self.config.seed)
    }

    /// Adam. Gradients reach it already clipped to `max_grad_norm` as a
    /// whole, see [`clip_grad_norm`](crate::learner::clip_grad_norm).
    pub fn create_optimizer(&self) -> impl Optimizer<ActorCritic<B>, B> {
        AdamConfig::new().with_epsilon(1e-8).init::<B, ActorCritic<B>>()
    }

    /// Run all iterations the timestep budget allows.
    ///
    /// `env_factory` is called once per worker per iteration, inside the
    /// worker thread, with the worker id.
    pub fn run<E, F>(
        &self,
        model_config: &ActorCriticConfig,
        mut model: ActorCritic<B>,
        env_factory: F,
        logger: &mut dyn MetricsLogger,
    ) -> Result<TrainingOutcome<B>>
    where
        E: Environment + 'static,
        F: Fn(usize) -> std::result::Result<E, EnvError> + Clone + Send + 'static,
    {
        let config = &self.config;
        let num_iterations = config.num_iterations();
        let batch_size = config.batch_size();
        let worker_device = <B::InnerBackend as Backend>::Device::default();

        let checkpointer = Checkpointer::new(
            &config.model_dir,
            &config.scenario_name(),
            config.checkpoint_interval,
        )?;
        let mut optimizer = self.create_optimizer();
        let mut minibatch_rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        let mut episodes = EpisodeStats::new();
        let mut timesteps = 0usize;
        let mut last_update = UpdateStats::default();

        info!(
            scenario = %config.scenario,
            workers = config.num_workers,
            steps_per_worker = config.steps_per_worker,
            batch_size,
            iterations = num_iterations,
            epochs = config.num_epochs,
            minibatch_size = config.minibatch_size,
            checkpoint = %checkpointer.path().display(),
            "starting PPO training"
        );

        let start = Instant::now();

        for iteration in 1..=num_iterations {
            let snapshot = ModelSnapshot::capture(&model.valid())?;
            let base_seed = config.iteration_seed(iteration);
            let tasks: Vec<WorkerTask> = (0..config.num_workers)
                .map(|worker_id| WorkerTask {
                    worker_id,
                    seed: base_seed.wrapping_add(worker_id as u64),
                    steps: config.steps_per_worker,
                    model_config: model_config.clone(),
                    snapshot: snapshot.clone(),
                })
                .collect();

            let trajectories = collect_rollouts::<B::InnerBackend, E, F>(
                tasks,
                env_factory.clone(),
                &worker_device,
                config.worker_timeout,
            )?;

            let mut builder = BatchBuilder::new(model_config.obs_dim, model_config.action_dim());
            for trajectory in &trajectories {
                builder.push(trajectory, config.gamma, config.gae_lambda)?;
                for (reward, length) in trajectory.completed_episodes() {
                    episodes.record(reward, length);
                }
            }
            let batch = builder.build(batch_size)?;
            timesteps += batch.len();

            let (updated, update_stats) =
                ppo_update(model, &mut optimizer, &batch, config, &mut minibatch_rng, &self.device)?;
            model = updated;
            last_update = update_stats;

            if !update_stats.approx_kl.is_finite() || !update_stats.policy_loss.is_finite() {
                warn!(
                    iteration,
                    approx_kl = update_stats.approx_kl,
                    policy_loss = update_stats.policy_loss,
                    "non-finite update statistics"
                );
            }

            // Run-average, includes learner time
            let elapsed = start.elapsed().as_secs_f32();
            let fps = if elapsed > 0.0 {
                timesteps as f32 / elapsed
            } else {
                0.0
            };
            logger.log(
                &TrainingSnapshot::new(iteration, timesteps, fps)
                    .with_episodes(episodes.total_episodes(), episodes.mean_reward(), episodes.mean_length())
                    .with_losses(update_stats),
            );

            if checkpointer.should_save(iteration) {
                checkpointer.save(&model)?;
            }
        }

        let checkpoint = checkpointer.save(&model)?;
        logger.flush();

        info!(
            iterations = num_iterations,
            timesteps,
            episodes = episodes.total_episodes(),
            duration_secs = start.elapsed().as_secs_f32(),
            checkpoint = %checkpoint.display(),
            "training complete"
        );

        Ok(TrainingOutcome {
            model,
            episodes,
            iterations: num_iterations,
            timesteps,
            last_update,
            checkpoint,
        })
    }
}
