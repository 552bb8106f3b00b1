//! Clipped-surrogate PPO update over one batch.
//!
//! ```text
//! Batch ─ normalize advantages (once)
//!   └─ for each epoch
//!        └─ fresh permutation → minibatches
//!             └─ forward → squashed log-prob → PPO loss → backward
//!                  → global-norm clip → Adam step
//! ```

use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use rand::Rng;
use tracing::warn;

use crate::algorithms::gae::normalize_advantages;
use crate::algorithms::ppo_loss::{ppo_loss, PpoLossConfig};
use crate::algorithms::squashed_gaussian::squashed_log_prob;
use crate::config::TrainConfig;
use crate::error::{tensor_to_scalar, Result};
use crate::model::ActorCritic;

use super::batch::{minibatch_indices, Batch};
use super::grad_norm::clip_grad_norm;

/// Loss terms averaged over every minibatch of every epoch.
///
/// Reporting only; nothing here feeds back into optimization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateStats {
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
    pub approx_kl: f32,
    pub clip_fraction: f32,
    /// Optimizer steps taken
    pub minibatches: usize,
}

impl UpdateStats {
    fn accumulate(&mut self, other: &UpdateStats) {
        self.policy_loss += other.policy_loss;
        self.value_loss += other.value_loss;
        self.entropy += other.entropy;
        self.approx_kl += other.approx_kl;
        self.clip_fraction += other.clip_fraction;
        self.minibatches += 1;
    }

    fn averaged(mut self) -> Self {
        if self.minibatches > 0 {
            let n = self.minibatches as f32;
            self.policy_loss /= n;
            self.value_loss /= n;
            self.entropy /= n;
            self.approx_kl /= n;
            self.clip_fraction /= n;
        }
        self
    }
}

/// Run `config.num_epochs` epochs of minibatch PPO on `batch`.
///
/// Advantages are normalized across the whole batch before any
/// minibatching. Each epoch draws a fresh permutation from `rng`.
pub fn ppo_update<B, O, R>(
    mut model: ActorCritic<B>,
    optimizer: &mut O,
    batch: &Batch,
    config: &TrainConfig,
    rng: &mut R,
    device: &B::Device,
) -> Result<(ActorCritic<B>, UpdateStats)>
where
    B: AutodiffBackend,
    O: Optimizer<ActorCritic<B>, B>,
    R: Rng,
{
    if batch.is_empty() {
        warn!("skipping PPO update on an empty batch");
        return Ok((model, UpdateStats::default()));
    }

    let mut normalized = batch.clone();
    normalize_advantages(&mut normalized.advantages);

    let loss_config = PpoLossConfig {
        clip_epsilon: config.clip_epsilon,
        value_loss_coef: config.value_loss_coef,
        entropy_coef: config.entropy_coef,
    };

    let mut totals = UpdateStats::default();

    for _epoch in 0..config.num_epochs {
        for indices in minibatch_indices(normalized.len(), config.minibatch_size, rng) {
            let mini = normalized.select(&indices);
            let (next, stats) = minibatch_step(
                model,
                optimizer,
                &mini,
                &loss_config,
                config.learning_rate,
                config.max_grad_norm,
                device,
            )?;
            model = next;
            totals.accumulate(&stats);
        }
    }

    Ok((model, totals.averaged()))
}

fn minibatch_step<B, O>(
    model: ActorCritic<B>,
    optimizer: &mut O,
    mini: &Batch,
    loss_config: &PpoLossConfig,
    learning_rate: f64,
    max_grad_norm: f32,
    device: &B::Device,
) -> Result<(ActorCritic<B>, UpdateStats)>
where
    B: AutodiffBackend,
    O: Optimizer<ActorCritic<B>, B>,
{
    let n = mini.len();

    let obs = Tensor::<B, 1>::from_floats(mini.observations.as_slice(), device).reshape([n, mini.obs_dim]);
    let actions = Tensor::<B, 1>::from_floats(mini.actions.as_slice(), device).reshape([n, mini.action_dim]);
    let old_log_probs = Tensor::<B, 1>::from_floats(mini.old_log_probs.as_slice(), device);
    let advantages = Tensor::<B, 1>::from_floats(mini.advantages.as_slice(), device);
    let returns = Tensor::<B, 1>::from_floats(mini.returns.as_slice(), device);

    let (mean, log_std, values) = model.forward(obs);
    let log_probs = squashed_log_prob(
        actions,
        mean,
        log_std.clone(),
        model.scale_row().detach(),
        model.bias_row().detach(),
    );

    let loss = ppo_loss(log_probs, old_log_probs, advantages, values, returns, log_std, loss_config);

    let stats = UpdateStats {
        policy_loss: tensor_to_scalar(loss.policy_loss.clone().detach())?,
        value_loss: tensor_to_scalar(loss.value_loss.clone().detach())?,
        entropy: tensor_to_scalar(loss.entropy.clone().detach())?,
        approx_kl: tensor_to_scalar(loss.approx_kl)?,
        clip_fraction: tensor_to_scalar(loss.clip_fraction)?,
        minibatches: 1,
    };

    let grads = loss.total.backward();
    let grads = GradientsParams::from_grads(grads, &model);
    let (grads, _) = clip_grad_norm::<B, _>(&model, grads, max_grad_norm)?;
    let model = optimizer.step(learning_rate, model, grads);

    Ok((model, stats))
}
