//! `drive-ppo`: multi-worker PPO on the car-following highway scenario.
//!
//! Recursion limit needed for WGPU's deeply nested types.
#![recursion_limit = "256"]
//!
//! ```bash
//! # Train with defaults (4 workers × 256 steps per iteration)
//! cargo run --release -- train
//!
//! # Continue from the last checkpoint with more workers
//! cargo run --release -- train --resume --num-workers 8
//!
//! # Accelerator learner
//! cargo run --release --features wgpu -- train --device accelerator
//!
//! # Deterministic evaluation of the saved policy
//! cargo run --release -- evaluate --episodes 10
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::tensor::backend::AutodiffBackend;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use drive_ppo::{
    evaluate_policy, load_checkpoint, ActorCriticConfig, Checkpointer, CsvLogger,
    DevicePreference, Environment, MultiLogger, PpoTrainer, TracingLogger, TrainConfig,
};
use highway_env::{CarFollowing, CarFollowingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "drive-ppo",
    about = "Multi-worker PPO training for continuous-control driving",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train a policy and checkpoint it under the model directory.
    Train(TrainArgs),
    /// Run deterministic episodes with a saved policy.
    Evaluate(EvaluateArgs),
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DeviceArg {
    Auto,
    Cpu,
    Accelerator,
}

impl From<DeviceArg> for DevicePreference {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Auto => DevicePreference::Auto,
            DeviceArg::Cpu => DevicePreference::Cpu,
            DeviceArg::Accelerator => DevicePreference::Accelerator,
        }
    }
}

/// Scenario knobs for the highway environment.
#[derive(Debug, Args)]
struct ScenarioArgs {
    /// Scenario identifier; its file stem names checkpoints and progress files.
    #[arg(long, default_value = "idm.scenic")]
    scenario: String,

    /// Random traffic vehicles besides the lead vehicle.
    #[arg(long, default_value_t = 6)]
    traffic: usize,

    /// Episode step limit before truncation.
    #[arg(long, default_value_t = 700)]
    max_episode_steps: usize,

    /// Initial gap to the lead vehicle (m).
    #[arg(long, default_value_t = 30.0)]
    lead_gap: f32,
}

impl ScenarioArgs {
    fn env_config(&self) -> CarFollowingConfig {
        CarFollowingConfig::new()
            .with_traffic(self.traffic)
            .with_max_steps(self.max_episode_steps)
            .with_lead_gap(self.lead_gap)
    }
}

#[derive(Debug, Args)]
struct TrainArgs {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// Parallel rollout workers per iteration.
    #[arg(long, default_value_t = 4)]
    num_workers: usize,

    /// Total environment steps budget.
    #[arg(long, default_value_t = 1_000_000)]
    total_timesteps: usize,

    /// Steps collected by each worker per iteration.
    #[arg(long, default_value_t = 256)]
    steps_per_worker: usize,

    /// Optimization epochs per iteration.
    #[arg(long, default_value_t = 4)]
    num_epochs: usize,

    /// Transitions per minibatch.
    #[arg(long, default_value_t = 6)]
    minibatch_size: usize,

    #[arg(long, default_value_t = 0.9)]
    gamma: f32,

    #[arg(long, default_value_t = 0.9)]
    gae_lambda: f32,

    #[arg(long, default_value_t = 0.2)]
    clip_epsilon: f32,

    #[arg(long, default_value_t = 3e-4)]
    learning_rate: f64,

    #[arg(long, default_value_t = 0.01)]
    entropy_coef: f32,

    #[arg(long, default_value_t = 0.5)]
    value_loss_coef: f32,

    #[arg(long, default_value_t = 0.5)]
    max_grad_norm: f32,

    /// Width of the shared hidden layers.
    #[arg(long, default_value_t = 64)]
    hidden_dim: usize,

    #[arg(long, default_value_t = 4)]
    seed: u64,

    /// Checkpoint and progress directory.
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,

    /// Iterations between checkpoint writes.
    #[arg(long, default_value_t = 1)]
    checkpoint_interval: usize,

    /// Seconds to wait for all workers of an iteration.
    #[arg(long, default_value_t = 600)]
    worker_timeout: u64,

    #[arg(long, value_enum, default_value_t = DeviceArg::Auto)]
    device: DeviceArg,

    /// Start from the existing checkpoint instead of fresh weights.
    #[arg(long)]
    resume: bool,
}

impl TrainArgs {
    fn train_config(&self) -> TrainConfig {
        TrainConfig::new()
            .with_scenario(self.scenario.scenario.clone())
            .with_num_workers(self.num_workers)
            .with_total_timesteps(self.total_timesteps)
            .with_steps_per_worker(self.steps_per_worker)
            .with_num_epochs(self.num_epochs)
            .with_minibatch_size(self.minibatch_size)
            .with_gamma(self.gamma)
            .with_gae_lambda(self.gae_lambda)
            .with_clip_epsilon(self.clip_epsilon)
            .with_learning_rate(self.learning_rate)
            .with_entropy_coef(self.entropy_coef)
            .with_value_loss_coef(self.value_loss_coef)
            .with_max_grad_norm(self.max_grad_norm)
            .with_hidden_dim(self.hidden_dim)
            .with_seed(self.seed)
            .with_model_dir(self.model_dir.clone())
            .with_checkpoint_interval(self.checkpoint_interval)
            .with_worker_timeout(Duration::from_secs(self.worker_timeout))
            .with_device(self.device.into())
    }
}

#[derive(Debug, Args)]
struct EvaluateArgs {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// Checkpoint file; defaults to `<model-dir>/ppo_<scenario>_model.bin`.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    #[arg(long, default_value = "models")]
    model_dir: PathBuf,

    /// Must match the width the checkpoint was trained with.
    #[arg(long, default_value_t = 64)]
    hidden_dim: usize,

    #[arg(long, default_value_t = 5)]
    episodes: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

// ============================================================================
// Backend Selection
// ============================================================================

type CpuBackend = NdArray<f32>;

#[cfg(feature = "wgpu")]
type AcceleratorBackend = burn::backend::Wgpu;

enum LearnerDevice {
    Cpu,
    #[cfg(feature = "wgpu")]
    Accelerator,
}

fn resolve_device(preference: DevicePreference) -> anyhow::Result<LearnerDevice> {
    match preference {
        DevicePreference::Cpu => Ok(LearnerDevice::Cpu),
        #[cfg(feature = "wgpu")]
        DevicePreference::Auto | DevicePreference::Accelerator => Ok(LearnerDevice::Accelerator),
        #[cfg(not(feature = "wgpu"))]
        DevicePreference::Auto => Ok(LearnerDevice::Cpu),
        #[cfg(not(feature = "wgpu"))]
        DevicePreference::Accelerator => {
            anyhow::bail!("accelerator requested but drive-ppo was built without the `wgpu` feature")
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn train<B: AutodiffBackend>(
    config: TrainConfig,
    device: B::Device,
    env_config: CarFollowingConfig,
    resume: bool,
) -> anyhow::Result<()> {
    let trainer = PpoTrainer::<B>::new(config, device)?;
    let config = trainer.config();

    let reference_env = CarFollowing::new(env_config.clone())?;
    let model_config = trainer.model_config(&reference_env);
    let mut model = trainer.init_model(&model_config);

    if resume {
        let checkpointer = Checkpointer::new(
            &config.model_dir,
            &config.scenario_name(),
            config.checkpoint_interval,
        )?;
        model = checkpointer
            .load::<B, _>(model, trainer.device())
            .with_context(|| format!("resuming from {}", checkpointer.path().display()))?;
        info!(path = %checkpointer.path().display(), "resumed from checkpoint");
    }

    fs::create_dir_all(&config.model_dir)
        .with_context(|| format!("creating {}", config.model_dir.display()))?;
    let progress_path = config
        .model_dir
        .join(format!("progress_{}.csv", config.scenario_name()));
    let csv = CsvLogger::new(&progress_path)
        .with_context(|| format!("opening {}", progress_path.display()))?;
    let mut logger = MultiLogger::new().add(TracingLogger::new()).add(csv);

    let env_factory = move |_worker_id: usize| CarFollowing::new(env_config.clone());
    let outcome = trainer.run(&model_config, model, env_factory, &mut logger)?;

    info!(
        iterations = outcome.iterations,
        timesteps = outcome.timesteps,
        episodes = outcome.episodes.total_episodes(),
        avg_reward = outcome.episodes.mean_reward(),
        checkpoint = %outcome.checkpoint.display(),
        progress = %progress_path.display(),
        "done"
    );
    Ok(())
}

fn evaluate(args: EvaluateArgs) -> anyhow::Result<()> {
    let device = NdArrayDevice::default();
    let mut env = CarFollowing::new(args.scenario.env_config())?;

    let scenario_name = TrainConfig::new()
        .with_scenario(args.scenario.scenario.clone())
        .scenario_name();
    let path = args
        .checkpoint
        .clone()
        .unwrap_or_else(|| Checkpointer::checkpoint_path(&args.model_dir, &scenario_name));

    let action_space = env.action_space().clone();
    let model_config = ActorCriticConfig::new(
        env.observation_space().flat_dim(),
        action_space.low,
        action_space.high,
    )
    .with_hidden_dim(args.hidden_dim);
    let template = model_config.init::<CpuBackend>(&device, args.seed);
    let model = load_checkpoint::<CpuBackend, _>(template, &path, &device)
        .with_context(|| format!("loading {}", path.display()))?;

    info!(checkpoint = %path.display(), episodes = args.episodes, "evaluating");
    let results = evaluate_policy(&model, &mut env, args.episodes, args.seed, &device)?;
    env.close();

    if results.is_empty() {
        return Ok(());
    }
    let n = results.len() as f32;
    let mean_reward = results.iter().map(|r| r.reward).sum::<f32>() / n;
    let mean_length = results.iter().map(|r| r.length as f32).sum::<f32>() / n;
    info!(mean_reward, mean_length, "evaluation finished");
    Ok(())
}

fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let config = args.train_config().build()?;
    let env_config = args.scenario.env_config();

    match resolve_device(config.device)? {
        LearnerDevice::Cpu => train::<Autodiff<CpuBackend>>(
            config,
            NdArrayDevice::default(),
            env_config,
            args.resume,
        ),
        #[cfg(feature = "wgpu")]
        LearnerDevice::Accelerator => train::<Autodiff<AcceleratorBackend>>(
            config,
            burn::backend::wgpu::WgpuDevice::default(),
            env_config,
            args.resume,
        ),
    }
}

fn main() -> anyhow::Result<()> {
    // A subscriber installed by an embedding process is left in place
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    match Cli::parse().command {
        Command::Train(args) => run_train(args),
        Command::Evaluate(args) => evaluate(args),
    }
}
