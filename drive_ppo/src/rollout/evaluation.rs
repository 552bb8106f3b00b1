//! Deterministic policy evaluation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use tracing::info;

use crate::environment::Environment;
use crate::error::{tensor_to_vec, Result};
use crate::model::ActorCritic;

/// Outcome of one evaluation episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeResult {
    pub reward: f32,
    pub length: usize,
}

/// Run `episodes` full episodes with the mean action `tanh(mean)·scale + bias`.
///
/// The first reset uses `seed`, later ones continue the environment's own
/// stream, so the whole evaluation is reproducible.
pub fn evaluate_policy<B: Backend, E: Environment>(
    model: &ActorCritic<B>,
    env: &mut E,
    episodes: usize,
    seed: u64,
    device: &B::Device,
) -> Result<Vec<EpisodeResult>> {
    let obs_dim = model.obs_dim();
    let mut results = Vec::with_capacity(episodes);

    for episode in 0..episodes {
        let reset_seed = if episode == 0 { Some(seed) } else { None };
        let (mut observation, _) = env.reset(reset_seed)?;
        let mut reward = 0.0f32;
        let mut length = 0usize;

        loop {
            let obs = Tensor::<B, 1>::from_floats(observation.as_slice(), device).reshape([1, obs_dim]);
            let action = tensor_to_vec(model.deterministic_action(obs))?;
            let outcome = env.step(&action)?;
            reward += outcome.reward;
            length += 1;
            if outcome.done() {
                break;
            }
            observation = outcome.observation;
        }

        info!(episode = episode + 1, reward, length, "evaluation episode");
        results.push(EpisodeResult { reward, length });
    }

    Ok(results)
}
