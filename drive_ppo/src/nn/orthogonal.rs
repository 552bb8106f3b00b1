//! Seeded orthogonal initialization for linear layers.
//!
//! Weights are produced by Gram–Schmidt on a Gaussian matrix drawn from a
//! seeded `Xoshiro256PlusPlus`, so the same seed yields the same network on
//! every backend and in every run.
//!
//! # Gain Values
//!
//! - 1.0: Linear/Identity outputs (value head)
//! - sqrt(2) ≈ 1.41: hidden layers
//! - 0.01: policy heads (near-zero initial mean and log-std logits)

use burn::module::{Module, Param};
use burn::prelude::*;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Configuration for [`OrthogonalLinear`].
#[derive(Debug, Clone)]
pub struct OrthogonalLinearConfig {
    /// Number of input features.
    pub d_input: usize,
    /// Number of output features.
    pub d_output: usize,
    /// Gain factor for scaling the orthogonal weights.
    pub gain: f64,
}

impl OrthogonalLinearConfig {
    /// Create a new configuration with gain 1.0.
    pub fn new(d_input: usize, d_output: usize) -> Self {
        Self {
            d_input,
            d_output,
            gain: 1.0,
        }
    }

    /// Set the gain factor.
    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    /// Initialize the layer with orthogonal weights drawn from `seed` and zero bias.
    pub fn init<B: Backend>(&self, device: &B::Device, seed: u64) -> OrthogonalLinear<B> {
        let values = orthogonal_matrix(self.d_output, self.d_input, self.gain, seed);
        let weight = Tensor::<B, 1>::from_floats(values.as_slice(), device)
            .reshape([self.d_output, self.d_input]);

        OrthogonalLinear {
            weight: Param::from_tensor(weight),
            bias: Param::from_tensor(Tensor::zeros([self.d_output], device)),
        }
    }
}

/// Linear layer with orthogonal initialization.
#[derive(Module, Debug)]
pub struct OrthogonalLinear<B: Backend> {
    /// Weight matrix of shape [d_output, d_input]
    pub weight: Param<Tensor<B, 2>>,
    /// Bias of shape [d_output]
    pub bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> OrthogonalLinear<B> {
    /// y = xW^T + b for input of shape [batch_size, d_input].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        input.matmul(self.weight.val().transpose()) + self.bias.val().unsqueeze_dim(0)
    }

    pub fn d_input(&self) -> usize {
        self.weight.dims()[1]
    }

    pub fn d_output(&self) -> usize {
        self.weight.dims()[0]
    }
}

/// Row-major `[rows, cols]` matrix with orthonormal columns (tall) or
/// orthonormal rows (wide), scaled by `gain`.
pub fn orthogonal_matrix(rows: usize, cols: usize, gain: f64, seed: u64) -> Vec<f32> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    // Orthogonalize along the shorter side.
    let (n_vectors, len) = if rows >= cols { (cols, rows) } else { (rows, cols) };
    let mut vectors: Vec<Vec<f64>> = (0..n_vectors)
        .map(|_| (0..len).map(|_| StandardNormal.sample(&mut rng)).collect())
        .collect();

    for i in 0..n_vectors {
        loop {
            for j in 0..i {
                let dot: f64 = vectors[i].iter().zip(&vectors[j]).map(|(a, b)| a * b).sum();
                let (head, tail) = vectors.split_at_mut(i);
                for (v, u) in tail[0].iter_mut().zip(&head[j]) {
                    *v -= dot * u;
                }
            }
            let norm = vectors[i].iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 1e-10 {
                vectors[i].iter_mut().for_each(|v| *v /= norm);
                break;
            }
            // Linearly dependent draw, resample
            vectors[i] = (0..len).map(|_| StandardNormal.sample(&mut rng)).collect();
        }
    }

    let mut out = vec![0.0f32; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            let v = if rows >= cols {
                vectors[c][r]
            } else {
                vectors[r][c]
            };
            out[r * cols + c] = (v * gain) as f32;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn gram(values: &[f32], rows: usize, cols: usize, by_columns: bool) -> Vec<Vec<f32>> {
        let n = if by_columns { cols } else { rows };
        let get = |v: usize, k: usize| {
            if by_columns {
                values[k * cols + v]
            } else {
                values[v * cols + k]
            }
        };
        let len = if by_columns { rows } else { cols };
        (0..n)
            .map(|a| {
                (0..n)
                    .map(|b| (0..len).map(|k| get(a, k) * get(b, k)).sum())
                    .collect()
            })
            .collect()
    }

    fn assert_identity(g: &[Vec<f32>], scale: f32) {
        for (i, row) in g.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                let expected = if i == j { scale } else { 0.0 };
                assert!((v - expected).abs() < 1e-4, "gram[{}][{}] = {}", i, j, v);
            }
        }
    }

    #[test]
    fn test_tall_matrix_has_orthonormal_columns() {
        let w = orthogonal_matrix(8, 4, 1.0, 3);
        assert_identity(&gram(&w, 8, 4, true), 1.0);
    }

    #[test]
    fn test_wide_matrix_has_orthonormal_rows() {
        let w = orthogonal_matrix(3, 10, 1.0, 3);
        assert_identity(&gram(&w, 3, 10, false), 1.0);
    }

    #[test]
    fn test_gain_scales_norm() {
        let w = orthogonal_matrix(5, 5, 2.0, 9);
        assert_identity(&gram(&w, 5, 5, true), 4.0);
    }

    #[test]
    fn test_same_seed_same_weights() {
        assert_eq!(orthogonal_matrix(6, 4, 1.0, 11), orthogonal_matrix(6, 4, 1.0, 11));
        assert_ne!(orthogonal_matrix(6, 4, 1.0, 11), orthogonal_matrix(6, 4, 1.0, 12));
    }

    #[test]
    fn test_linear_forward_shape_and_zero_bias() {
        let device = Default::default();
        let layer = OrthogonalLinearConfig::new(4, 3)
            .with_gain(1.0)
            .init::<TestBackend>(&device, 0);
        assert_eq!(layer.d_input(), 4);
        assert_eq!(layer.d_output(), 3);

        let out = layer.forward(Tensor::zeros([2, 4], &device));
        assert_eq!(out.dims(), [2, 3]);
        let values: Vec<f32> = out.into_data().as_slice::<f32>().unwrap().to_vec();
        assert!(values.iter().all(|&v| v == 0.0));
    }
}
