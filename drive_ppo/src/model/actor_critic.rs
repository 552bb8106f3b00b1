//! Shared actor-critic network with a squashed Gaussian policy head.
//!
//! ```text
//! obs ─ shared_0 ─ tanh ─ shared_1 ─ tanh ─┬─ policy_mean ─────────────── mean
//!                                          ├─ policy_log_std ─ rescale ── log_std
//!                                          └─ value_head ──────────────── value
//! ```
//!
//! `action_scale` and `action_bias` are fixed buffers derived from the
//! action box. They are stored as non-trainable parameters so that they
//! travel with the checkpoint and the worker snapshot.

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::activation::tanh;

use crate::nn::{OrthogonalLinear, OrthogonalLinearConfig};

/// Lower bound of the policy log standard deviation.
pub const LOG_STD_MIN: f32 = -5.0;
/// Upper bound of the policy log standard deviation.
pub const LOG_STD_MAX: f32 = 2.0;

/// Configuration for [`ActorCritic`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActorCriticConfig {
    /// Flattened observation size
    pub obs_dim: usize,
    /// Lower action bounds
    pub action_low: Vec<f32>,
    /// Upper action bounds
    pub action_high: Vec<f32>,
    /// Width of both shared hidden layers
    pub hidden_dim: usize,
}

impl ActorCriticConfig {
    pub fn new(obs_dim: usize, action_low: Vec<f32>, action_high: Vec<f32>) -> Self {
        Self {
            obs_dim,
            action_low,
            action_high,
            hidden_dim: 64,
        }
    }

    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    pub fn action_dim(&self) -> usize {
        self.action_low.len()
    }

    /// Build the network. Weights are a pure function of `seed`.
    pub fn init<B: Backend>(&self, device: &B::Device, seed: u64) -> ActorCritic<B> {
        let hidden = self.hidden_dim;
        let action_dim = self.action_dim();
        let sqrt2 = std::f64::consts::SQRT_2;

        // Distinct, reproducible stream per layer
        let layer_seed = |i: u64| seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(i);

        let scale: Vec<f32> = self
            .action_low
            .iter()
            .zip(&self.action_high)
            .map(|(l, h)| (h - l) / 2.0)
            .collect();
        let bias: Vec<f32> = self
            .action_low
            .iter()
            .zip(&self.action_high)
            .map(|(l, h)| (h + l) / 2.0)
            .collect();

        ActorCritic {
            shared_0: OrthogonalLinearConfig::new(self.obs_dim, hidden)
                .with_gain(sqrt2)
                .init(device, layer_seed(0)),
            shared_1: OrthogonalLinearConfig::new(hidden, hidden)
                .with_gain(sqrt2)
                .init(device, layer_seed(1)),
            policy_mean: OrthogonalLinearConfig::new(hidden, action_dim)
                .with_gain(0.01)
                .init(device, layer_seed(2)),
            policy_log_std: OrthogonalLinearConfig::new(hidden, action_dim)
                .with_gain(0.01)
                .init(device, layer_seed(3)),
            value_head: OrthogonalLinearConfig::new(hidden, 1)
                .with_gain(1.0)
                .init(device, layer_seed(4)),
            action_scale: buffer(&scale, device),
            action_bias: buffer(&bias, device),
        }
    }
}

fn buffer<B: Backend>(values: &[f32], device: &B::Device) -> Param<Tensor<B, 1>> {
    Param::from_tensor(Tensor::<B, 1>::from_floats(values, device)).set_require_grad(false)
}

/// Actor-critic network for continuous PPO with a squashed Gaussian policy.
#[derive(Module, Debug)]
pub struct ActorCritic<B: Backend> {
    shared_0: OrthogonalLinear<B>,
    shared_1: OrthogonalLinear<B>,
    policy_mean: OrthogonalLinear<B>,
    policy_log_std: OrthogonalLinear<B>,
    value_head: OrthogonalLinear<B>,
    action_scale: Param<Tensor<B, 1>>,
    action_bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> ActorCritic<B> {
    /// Forward pass returning (mean, log_std, value).
    ///
    /// # Arguments
    /// * `obs` - Flattened observations: [batch_size, obs_dim]
    ///
    /// # Returns
    /// * `mean` - [batch_size, action_dim]
    /// * `log_std` - [batch_size, action_dim], inside [LOG_STD_MIN, LOG_STD_MAX]
    /// * `value` - [batch_size]
    pub fn forward(&self, obs: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 1>) {
        let x = tanh(self.shared_0.forward(obs));
        let x = tanh(self.shared_1.forward(x));

        let mean = self.policy_mean.forward(x.clone());

        // Smoothly squash into [LOG_STD_MIN, LOG_STD_MAX]
        let raw = tanh(self.policy_log_std.forward(x.clone()));
        let log_std = (raw + 1.0) * (0.5 * (LOG_STD_MAX - LOG_STD_MIN)) + LOG_STD_MIN;

        let value = self.value_head.forward(x).flatten(0, 1);

        (mean, log_std, value)
    }

    /// Mean action mapped into the action box: `tanh(mean) · scale + bias`.
    pub fn deterministic_action(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let (mean, _, _) = self.forward(obs);
        tanh(mean) * self.scale_row() + self.bias_row()
    }

    /// Value estimates only: [batch_size]
    pub fn value(&self, obs: Tensor<B, 2>) -> Tensor<B, 1> {
        let (_, _, value) = self.forward(obs);
        value
    }

    /// `(high − low) / 2`: [action_dim]
    pub fn action_scale(&self) -> Tensor<B, 1> {
        self.action_scale.val()
    }

    /// `(high + low) / 2`: [action_dim]
    pub fn action_bias(&self) -> Tensor<B, 1> {
        self.action_bias.val()
    }

    /// `action_scale` as a broadcastable row: [1, action_dim]
    pub fn scale_row(&self) -> Tensor<B, 2> {
        self.action_scale.val().unsqueeze_dim(0)
    }

    /// `action_bias` as a broadcastable row: [1, action_dim]
    pub fn bias_row(&self) -> Tensor<B, 2> {
        self.action_bias.val().unsqueeze_dim(0)
    }

    pub fn obs_dim(&self) -> usize {
        self.shared_0.d_input()
    }

    pub fn action_dim(&self) -> usize {
        self.policy_mean.d_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn to_vec<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
        tensor.into_data().as_slice::<f32>().unwrap().to_vec()
    }

    fn config() -> ActorCriticConfig {
        ActorCriticConfig::new(35, vec![-1.0, -1.0], vec![1.0, 1.0])
    }

    fn obs(batch: usize, device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2> {
        let values: Vec<f32> = (0..batch * 35).map(|i| ((i % 11) as f32 - 5.0) * 0.2).collect();
        Tensor::<TestBackend, 1>::from_floats(values.as_slice(), device).reshape([batch, 35])
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let model = config().init::<TestBackend>(&device, 0);
        let (mean, log_std, value) = model.forward(obs(3, &device));
        assert_eq!(mean.dims(), [3, 2]);
        assert_eq!(log_std.dims(), [3, 2]);
        assert_eq!(value.dims(), [3]);
        assert_eq!(model.obs_dim(), 35);
        assert_eq!(model.action_dim(), 2);
    }

    #[test]
    fn test_log_std_is_bounded() {
        let device = Default::default();
        let model = config().with_hidden_dim(16).init::<TestBackend>(&device, 5);
        let big = obs(4, &device) * 1000.0;
        let (_, log_std, _) = model.forward(big);
        for v in to_vec(log_std) {
            assert!(v >= LOG_STD_MIN && v <= LOG_STD_MAX, "log_std {} out of range", v);
        }
    }

    #[test]
    fn test_initial_log_std_is_near_midpoint() {
        // Policy heads start with gain 0.01, so raw logits are near zero
        let device = Default::default();
        let model = config().init::<TestBackend>(&device, 1);
        let (_, log_std, _) = model.forward(obs(2, &device));
        let midpoint = 0.5 * (LOG_STD_MIN + LOG_STD_MAX);
        for v in to_vec(log_std) {
            assert!((v - midpoint).abs() < 0.5);
        }
    }

    #[test]
    fn test_action_buffers_from_bounds() {
        let device = Default::default();
        let model = ActorCriticConfig::new(4, vec![-2.0, 0.0], vec![2.0, 1.0])
            .init::<TestBackend>(&device, 0);
        assert_eq!(to_vec(model.action_scale()), vec![2.0, 0.5]);
        assert_eq!(to_vec(model.action_bias()), vec![0.0, 0.5]);
    }

    #[test]
    fn test_deterministic_action_in_bounds() {
        let device = Default::default();
        let model = ActorCriticConfig::new(35, vec![-2.0, 0.0], vec![2.0, 1.0])
            .init::<TestBackend>(&device, 3);
        let actions = to_vec(model.deterministic_action(obs(5, &device)));
        for pair in actions.chunks(2) {
            assert!(pair[0] >= -2.0 && pair[0] <= 2.0);
            assert!(pair[1] >= 0.0 && pair[1] <= 1.0);
        }
    }

    #[test]
    fn test_init_is_deterministic_per_seed() {
        let device = Default::default();
        let a = config().init::<TestBackend>(&device, 9);
        let b = config().init::<TestBackend>(&device, 9);
        let c = config().init::<TestBackend>(&device, 10);
        let (_, _, va) = a.forward(obs(2, &device));
        let (_, _, vb) = b.forward(obs(2, &device));
        let (_, _, vc) = c.forward(obs(2, &device));
        assert_eq!(to_vec(va.clone()), to_vec(vb));
        assert_ne!(to_vec(va), to_vec(vc));
    }
}
