//! PPO clipped-surrogate loss for the squashed Gaussian policy.
//!
//! total = policy_loss + value_coef · value_loss − entropy_coef · entropy
//!
//! # Numerical Stability
//!
//! The log ratio is clamped to [-20, 20] before exp() to prevent overflow.
//! This limits ratios to approximately [2e-9, 485 million].

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::squashed_gaussian::gaussian_entropy;

/// Maximum log ratio before exp() to prevent overflow.
const MAX_LOG_RATIO: f32 = 20.0;

/// Loss coefficients read from the training configuration.
#[derive(Debug, Clone, Copy)]
pub struct PpoLossConfig {
    pub clip_epsilon: f32,
    pub value_loss_coef: f32,
    pub entropy_coef: f32,
}

/// Loss terms for one minibatch. Every tensor has a single element.
#[derive(Debug, Clone)]
pub struct PpoLoss<B: Backend> {
    /// Combined loss to backpropagate
    pub total: Tensor<B, 1>,
    pub policy_loss: Tensor<B, 1>,
    /// 0.5 · MSE(value, return)
    pub value_loss: Tensor<B, 1>,
    /// Mean per-dimension Gaussian entropy
    pub entropy: Tensor<B, 1>,
    /// Detached KL estimate `mean((r − 1) − log r)`
    pub approx_kl: Tensor<B, 1>,
    /// Detached fraction of samples with `|r − 1| > ε`
    pub clip_fraction: Tensor<B, 1>,
}

/// PPO clipped surrogate loss (scalar reference).
///
/// L^CLIP(θ) = E[min(r_t(θ) * A_t, clip(r_t(θ), 1-ε, 1+ε) * A_t)]
///
/// where r_t(θ) = π_θ(a_t|s_t) / π_θ_old(a_t|s_t). Returns the negated mean.
pub fn ppo_clip_loss_scalar(
    log_probs: &[f32],
    old_log_probs: &[f32],
    advantages: &[f32],
    clip_epsilon: f32,
) -> f32 {
    let n = log_probs.len();
    assert_eq!(old_log_probs.len(), n);
    assert_eq!(advantages.len(), n);

    if n == 0 {
        return 0.0;
    }

    let total: f32 = (0..n)
        .map(|i| {
            let log_ratio = (log_probs[i] - old_log_probs[i]).clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO);
            let ratio = log_ratio.exp();
            let clipped = ratio.clamp(1.0 - clip_epsilon, 1.0 + clip_epsilon);
            (ratio * advantages[i]).min(clipped * advantages[i])
        })
        .sum();

    -total / n as f32
}

/// PPO clipped surrogate loss (tensor computation for gradient).
///
/// # Arguments
///
/// * `log_probs` - Current policy log probs: [batch_size]
/// * `old_log_probs` - Log probs recorded at rollout: [batch_size]
/// * `advantages` - Normalized advantages: [batch_size]
/// * `clip_epsilon` - Clipping ratio ε
pub fn ppo_clip_loss<B: Backend>(
    log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    clip_epsilon: f32,
) -> Tensor<B, 1> {
    let ratio = (log_probs - old_log_probs)
        .clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO)
        .exp();
    let clipped_ratio = ratio.clone().clamp(1.0 - clip_epsilon, 1.0 + clip_epsilon);

    let surr1 = ratio * advantages.clone();
    let surr2 = clipped_ratio * advantages;

    // Pessimistic bound, negated for minimization
    surr1.min_pair(surr2).mean().neg()
}

/// Full PPO loss for one minibatch.
///
/// # Arguments
///
/// * `log_probs` - Current policy log probs: [batch_size]
/// * `old_log_probs` - Log probs recorded at rollout: [batch_size]
/// * `advantages` - Normalized advantages: [batch_size]
/// * `values` - Current value predictions: [batch_size]
/// * `returns` - GAE return targets: [batch_size]
/// * `log_std` - Current log standard deviation: [batch_size, action_dim]
pub fn ppo_loss<B: Backend>(
    log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    values: Tensor<B, 1>,
    returns: Tensor<B, 1>,
    log_std: Tensor<B, 2>,
    config: &PpoLossConfig,
) -> PpoLoss<B> {
    let log_ratio = (log_probs.clone() - old_log_probs.clone()).detach();
    let ratio = log_ratio.clone().clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO).exp();
    let approx_kl = (ratio.clone() - 1.0 - log_ratio).mean();
    let clip_fraction = (ratio - 1.0)
        .abs()
        .greater_elem(config.clip_epsilon)
        .float()
        .mean();

    let policy_loss = ppo_clip_loss(log_probs, old_log_probs, advantages, config.clip_epsilon);
    let value_loss = (values - returns).powf_scalar(2.0).mean() * 0.5;
    let entropy = gaussian_entropy(log_std);

    let total = policy_loss.clone() + value_loss.clone() * config.value_loss_coef
        - entropy.clone() * config.entropy_coef;

    PpoLoss {
        total,
        policy_loss,
        value_loss,
        entropy,
        approx_kl,
        clip_fraction,
    }
}
