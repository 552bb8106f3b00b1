//! Algorithm components.
//!
//! - `gae`: Generalized Advantage Estimation and advantage normalization
//! - `squashed_gaussian`: tanh-squashed Gaussian sampling, log-prob and entropy
//! - `ppo_loss`: clipped-surrogate PPO loss

pub mod gae;
pub mod ppo_loss;
pub mod squashed_gaussian;

#[cfg(test)]
mod tests;

pub use gae::{compute_gae, normalize_advantages};
pub use ppo_loss::{ppo_clip_loss, ppo_clip_loss_scalar, ppo_loss, PpoLoss, PpoLossConfig};
pub use squashed_gaussian::{
    gaussian_entropy, sample_squashed, squashed_log_prob, squashed_log_prob_scalar,
    SquashedSample,
};
