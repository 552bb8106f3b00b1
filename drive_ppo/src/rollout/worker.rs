//! Rollout worker: one thread, one environment, one trajectory.
//!
//! A worker is started fresh every iteration. It builds its own
//! environment from the factory, restores a private model from the
//! snapshot bytes, collects exactly `steps` transitions, sends the result
//! on its channel and exits. Nothing is shared with the learner or with
//! other workers.

use std::thread::JoinHandle;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use crossbeam_channel::Sender;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

use crate::algorithms::squashed_gaussian::sample_squashed;
use crate::environment::{EnvError, Environment};
use crate::error::{tensor_to_vec, Result, TrainError};
use crate::model::{ActorCritic, ActorCriticConfig};

use super::snapshot::ModelSnapshot;
use super::trajectory::{Trajectory, Transition};

/// Message a worker sends back: its trajectory or the error that stopped it.
pub type WorkerMessage = Result<Trajectory>;

/// Everything a worker needs, owned.
#[derive(Debug, Clone)]
pub struct WorkerTask {
    pub worker_id: usize,
    /// Seeds both the environment reset and the action noise
    pub seed: u64,
    /// Transitions to collect
    pub steps: usize,
    /// Architecture used to rebuild the model from `snapshot`
    pub model_config: ActorCriticConfig,
    pub snapshot: ModelSnapshot,
}

/// Policy outputs for a single observation.
struct PolicyStep {
    mean: Vec<f32>,
    log_std: Vec<f32>,
    value: f32,
}

fn evaluate<B: Backend>(
    model: &ActorCritic<B>,
    observation: &[f32],
    device: &B::Device,
) -> Result<PolicyStep> {
    let obs = Tensor::<B, 1>::from_floats(observation, device).reshape([1, observation.len()]);
    let (mean, log_std, value) = model.forward(obs);
    let value = tensor_to_vec(value)?
        .first()
        .copied()
        .ok_or_else(|| TrainError::Tensor("empty value output".to_string()))?;
    Ok(PolicyStep {
        mean: tensor_to_vec(mean)?,
        log_std: tensor_to_vec(log_std)?,
        value,
    })
}

fn check_obs(worker_id: usize, observation: &[f32], expected: usize) -> Result<()> {
    if observation.len() != expected {
        return Err(env_error(
            worker_id,
            EnvError::ObservationDimensionMismatch {
                expected,
                actual: observation.len(),
            },
        ));
    }
    Ok(())
}

fn env_error(worker_id: usize, source: EnvError) -> TrainError {
    TrainError::Env {
        worker_id: Some(worker_id),
        source,
    }
}

/// Collect exactly `steps` transitions from `env` with `model`.
///
/// The environment is reset once with `seed`; finished episodes are reset
/// in place and collection continues in the same trajectory. The action
/// noise RNG is seeded with `seed` as well.
pub fn collect_trajectory<B: Backend, E: Environment>(
    worker_id: usize,
    model: &ActorCritic<B>,
    env: &mut E,
    steps: usize,
    seed: u64,
    device: &B::Device,
) -> Result<Trajectory> {
    let obs_dim = model.obs_dim();
    let action_dim = model.action_dim();

    let declared_obs = env.observation_space().flat_dim();
    if declared_obs != obs_dim {
        return Err(env_error(
            worker_id,
            EnvError::ObservationDimensionMismatch {
                expected: obs_dim,
                actual: declared_obs,
            },
        ));
    }
    let declared_action = env.action_space().dim();
    if declared_action != action_dim {
        return Err(env_error(
            worker_id,
            EnvError::ActionDimensionMismatch {
                expected: action_dim,
                actual: declared_action,
            },
        ));
    }

    let scale = tensor_to_vec(model.action_scale())?;
    let bias = tensor_to_vec(model.action_bias())?;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let (mut observation, _) = env
        .reset(Some(seed))
        .map_err(|e| env_error(worker_id, e))?;
    check_obs(worker_id, &observation, obs_dim)?;

    let mut trajectory = Trajectory::with_capacity(worker_id, obs_dim, action_dim, steps);
    let mut last_done = false;

    for _ in 0..steps {
        let policy = evaluate(model, &observation, device)?;
        let sample = sample_squashed(&policy.mean, &policy.log_std, &scale, &bias, &mut rng);

        let outcome = env
            .step(&sample.action)
            .map_err(|e| env_error(worker_id, e))?;
        let done = outcome.done();

        let next_observation = if done {
            env.reset(None).map_err(|e| env_error(worker_id, e))?.0
        } else {
            outcome.observation
        };
        check_obs(worker_id, &next_observation, obs_dim)?;

        trajectory.push(Transition {
            observation: std::mem::replace(&mut observation, next_observation),
            action: sample.action,
            log_prob: sample.log_prob,
            reward: outcome.reward,
            done,
            value: policy.value,
        });
        last_done = done;
    }

    trajectory.last_value = evaluate(model, &observation, device)?.value;
    trajectory.last_done = last_done;

    Ok(trajectory)
}

/// Body of a worker thread: build env and model, collect, report.
///
/// The outcome is always sent, errors included. A closed channel means the
/// learner already gave up on this iteration, so a failed send is ignored.
pub fn run_worker<B, E, F>(task: WorkerTask, env_factory: F, device: B::Device, sender: Sender<WorkerMessage>)
where
    B: Backend,
    E: Environment,
    F: Fn(usize) -> std::result::Result<E, EnvError>,
{
    let worker_id = task.worker_id;
    debug!(worker_id, seed = task.seed, steps = task.steps, "worker started");

    let result = (|| -> Result<Trajectory> {
        let mut env = env_factory(worker_id).map_err(|e| env_error(worker_id, e))?;
        let template = task.model_config.init::<B>(&device, 0);
        let model = task.snapshot.restore(template, &device)?;
        let trajectory = collect_trajectory(worker_id, &model, &mut env, task.steps, task.seed, &device);
        env.close();
        trajectory
    })();

    match &result {
        Ok(trajectory) => debug!(worker_id, steps = trajectory.len(), "worker finished"),
        Err(e) => debug!(worker_id, error = %e, "worker failed"),
    }

    let _ = sender.send(result);
}

/// Start a worker on its own OS thread named `rollout-worker-<id>`.
pub fn spawn_worker<B, E, F>(
    task: WorkerTask,
    env_factory: F,
    device: B::Device,
    sender: Sender<WorkerMessage>,
) -> Result<JoinHandle<()>>
where
    B: Backend,
    E: Environment + 'static,
    F: Fn(usize) -> std::result::Result<E, EnvError> + Send + 'static,
{
    let worker_id = task.worker_id;
    std::thread::Builder::new()
        .name(format!("rollout-worker-{}", worker_id))
        .spawn(move || run_worker::<B, E, F>(task, env_factory, device, sender))
        .map_err(|e| TrainError::WorkerSpawn {
            worker_id,
            message: e.to_string(),
        })
}
