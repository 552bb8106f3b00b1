//! Generalized Advantage Estimation.
//!
//! GAE provides a family of policy gradient estimators parameterized by λ:
//! - λ = 0: one-step TD (low variance, high bias)
//! - λ = 1: Monte Carlo (high variance, low bias)
//! - λ ∈ (0, 1): interpolation
//!
//! ## Formula
//!
//! A_t^GAE(γ,λ) = Σ_{l=0}^{∞} (γλ)^l δ_{t+l}
//! where δ_t = r_t + γ V(s_{t+1}) - V(s_t)
//!
//! ## References
//!
//! - Schulman et al., "High-Dimensional Continuous Control Using
//!   Generalized Advantage Estimation" (2016)

/// Compute GAE advantages and returns for a single trajectory.
///
/// Bootstrap values are trajectory-local, so this must run on each worker's
/// trajectory before trajectories are concatenated.
///
/// # Arguments
///
/// * `rewards` - rewards received [T]
/// * `values` - value estimates V(s_t) [T]
/// * `dones` - episode ended after step t [T]
/// * `last_value` - V(s_T), the observation after the last recorded step
/// * `last_done` - whether s_T started a fresh episode (bootstrap becomes 0)
/// * `gamma` - discount factor
/// * `gae_lambda` - GAE λ parameter
///
/// # Returns
///
/// (advantages, returns) - both [T], with `returns[t] = advantages[t] + values[t]`
///
/// # Panics
///
/// If `values` or `dones` differ in length from `rewards`.
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    last_value: f32,
    last_done: bool,
    gamma: f32,
    gae_lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    assert_eq!(values.len(), n);
    assert_eq!(dones.len(), n);

    let mut advantages = vec![0.0f32; n];
    let mut returns = vec![0.0f32; n];

    let mut gae = 0.0f32;
    let mut next_value = if last_done { 0.0 } else { last_value };

    for t in (0..n).rev() {
        let not_done = if dones[t] { 0.0 } else { 1.0 };

        // TD residual: δ_t = r_t + γ * V(s_{t+1}) - V(s_t)
        let delta = rewards[t] + gamma * next_value * not_done - values[t];

        // GAE: A_t = δ_t + γλ * A_{t+1}
        gae = delta + gamma * gae_lambda * not_done * gae;

        advantages[t] = gae;
        returns[t] = gae + values[t];

        next_value = values[t];
    }

    (advantages, returns)
}

/// Normalize advantages to zero mean and unit scale.
///
/// Uses the sample (n − 1) standard deviation and divides by `std + 1e-8`.
///
/// # Edge Cases
///
/// - Empty slice: no-op
/// - Single element: only mean-centered (becomes 0.0)
/// - All same values: all become 0.0 (epsilon prevents NaN)
pub fn normalize_advantages(advantages: &mut [f32]) {
    if advantages.is_empty() {
        return;
    }

    let n = advantages.len();
    let mean = advantages.iter().map(|&a| a as f64).sum::<f64>() / n as f64;

    if n == 1 {
        advantages[0] = (advantages[0] as f64 - mean) as f32;
        return;
    }

    let variance = advantages
        .iter()
        .map(|&a| (a as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    let std = variance.sqrt() + 1e-8;

    for a in advantages.iter_mut() {
        *a = ((*a as f64 - mean) / std) as f32;
    }
}
