//! Squashed Gaussian policy distribution.
//!
//! A pre-action `x ~ N(μ, σ)` is squashed with `y = tanh(x)` and mapped to
//! the environment's box with `a = y · scale + bias`. Its log-density is
//!
//! ```text
//! log π(a|s) = Σ_d [ log N(x_d; μ_d, σ_d) − log(scale_d · (1 − y_d²) + ε) ]
//! ```
//!
//! Two implementations share that formula: a scalar one used by rollout
//! workers (one observation at a time, CPU noise) and a tensor one used by
//! the learner to recompute log-probabilities under the current parameters.
//! Both evaluate the density at the emitted action through the same inverse
//! map (`y = clamp((a − bias)/scale)`, `x = atanh(y)`), so a recorded
//! log-probability is reproduced exactly by the learner when parameters
//! have not changed.
//!
//! The recorded log-probability is therefore evaluated at the reconstructed
//! `atanh(clamp((a − bias)/scale))`, not at the drawn `x`. When `tanh(x)`
//! saturates in `f32`, every large draw maps to the same clamped `y`, so the
//! recorded value no longer depends on `x` and differs from
//! `log N(x) − log(scale · (1 − y²) + ε)` evaluated at the draw.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::Rng;
use rand_distr::StandardNormal;

/// Guards `log(0)` in the squash correction and bounds `atanh`'s input.
pub const EPSILON: f32 = 1e-6;

const HALF_LOG_2PI: f32 = 0.918_938_5;

/// One sampled action with its log-probability.
#[derive(Debug, Clone, PartialEq)]
pub struct SquashedSample {
    /// Action in environment units, inside `[bias − scale, bias + scale]`
    pub action: Vec<f32>,
    /// Log-density of `action`, summed over action dimensions
    pub log_prob: f32,
}

/// Sample one action from the squashed Gaussian.
///
/// All slices have the action dimensionality.
pub fn sample_squashed<R: Rng>(
    mean: &[f32],
    log_std: &[f32],
    scale: &[f32],
    bias: &[f32],
    rng: &mut R,
) -> SquashedSample {
    let action: Vec<f32> = mean
        .iter()
        .zip(log_std)
        .zip(scale.iter().zip(bias))
        .map(|((&mu, &ls), (&s, &b))| {
            let z: f32 = rng.sample(StandardNormal);
            let x = mu + ls.exp() * z;
            x.tanh() * s + b
        })
        .collect();

    let log_prob = squashed_log_prob_scalar(&action, mean, log_std, scale, bias);
    SquashedSample { action, log_prob }
}

/// Log-density of `action` under the squashed Gaussian (single observation).
pub fn squashed_log_prob_scalar(
    action: &[f32],
    mean: &[f32],
    log_std: &[f32],
    scale: &[f32],
    bias: &[f32],
) -> f32 {
    action
        .iter()
        .zip(mean.iter().zip(log_std))
        .zip(scale.iter().zip(bias))
        .map(|((&a, (&mu, &ls)), (&s, &b))| {
            let y = ((a - b) / s).clamp(-1.0 + EPSILON, 1.0 - EPSILON);
            let x = 0.5 * ((1.0 + y) / (1.0 - y)).ln();
            let z = (x - mu) / ls.exp();
            -0.5 * z * z - ls - HALF_LOG_2PI - (s * (1.0 - y * y) + EPSILON).ln()
        })
        .sum()
}

/// Batched log-density of `actions` under the squashed Gaussian.
///
/// # Arguments
/// * `actions` - Actions in environment units: [batch_size, action_dim]
/// * `mean` - Pre-squash mean: [batch_size, action_dim]
/// * `log_std` - Pre-squash log standard deviation: [batch_size, action_dim]
/// * `scale` / `bias` - Affine map: [1, action_dim]
///
/// # Returns
/// Log probabilities: [batch_size]
pub fn squashed_log_prob<B: Backend>(
    actions: Tensor<B, 2>,
    mean: Tensor<B, 2>,
    log_std: Tensor<B, 2>,
    scale: Tensor<B, 2>,
    bias: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let [batch_size, _] = actions.dims();

    // Recover the pre-squash action
    let y = ((actions - bias) / scale.clone()).clamp(-1.0 + EPSILON, 1.0 - EPSILON);
    let x = atanh(y.clone());

    let z = (x - mean) / log_std.clone().exp();
    let gaussian = z.powf_scalar(2.0) * (-0.5) - log_std - HALF_LOG_2PI;

    let one_minus_sq = y.clone() * y * (-1.0) + 1.0;
    let correction = (scale * one_minus_sq + EPSILON).log();

    (gaussian - correction).sum_dim(1).reshape([batch_size])
}

/// Mean per-dimension entropy of the pre-squash Gaussian.
///
/// `H_d = log σ_d + 0.5 + 0.5·log(2π)`, averaged over batch and action
/// dimensions. Returns a single-element tensor.
pub fn gaussian_entropy<B: Backend>(log_std: Tensor<B, 2>) -> Tensor<B, 1> {
    (log_std + (0.5 + HALF_LOG_2PI)).mean()
}

/// atanh(x) = 0.5 · log((1 + x) / (1 − x)); input must lie in (−1, 1).
fn atanh<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let one_plus_x = x.clone() + 1.0;
    let one_minus_x = x * (-1.0) + 1.0;
    (one_plus_x / one_minus_x).log() * 0.5
}
