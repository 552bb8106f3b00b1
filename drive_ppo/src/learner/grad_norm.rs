//! Global gradient-norm clipping.
//!
//! All gradients of a module are treated as one vector: when its L2 norm
//! exceeds `max_norm`, every gradient is scaled by the same factor
//! `max_norm / (norm + 1e-6)`. Parameters without a gradient (frozen
//! buffers) are skipped.

use burn::module::{Module, ModuleVisitor, Param};
use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;

use crate::error::{tensor_to_scalar, Result};

const NORM_EPSILON: f32 = 1e-6;

/// Collects the squared L2 norm of each parameter's gradient.
struct SquaredNormCollector<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    squares: Vec<Tensor<B::InnerBackend, 1>>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNormCollector<'_, B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(param.id.clone()) {
            self.squares.push(grad.clone().mul(grad).sum());
        }
    }
}

/// Multiplies every registered gradient by `factor`.
struct GradScaler<'a> {
    grads: &'a mut GradientsParams,
    factor: f32,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradScaler<'_> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(param.id.clone()) {
            self.grads
                .register::<B::InnerBackend, D>(param.id.clone(), grad.mul_scalar(self.factor));
        }
    }
}

/// L2 norm of each parameter gradient, in module traversal order.
pub fn grad_norms<B, M>(module: &M, grads: &GradientsParams) -> Result<Vec<f32>>
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let mut collector = SquaredNormCollector::<B> {
        grads,
        squares: Vec::new(),
    };
    module.visit(&mut collector);

    collector
        .squares
        .into_iter()
        .map(|square| tensor_to_scalar(square).map(f32::sqrt))
        .collect()
}

/// Norm of all gradients taken together.
pub fn global_norm(norms: &[f32]) -> f32 {
    norms.iter().map(|n| n * n).sum::<f32>().sqrt()
}

/// Scale `grads` so their global norm is at most `max_norm`.
///
/// Returns the clipped gradients and the global norm before clipping.
pub fn clip_grad_norm<B, M>(
    module: &M,
    mut grads: GradientsParams,
    max_norm: f32,
) -> Result<(GradientsParams, f32)>
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let norm = global_norm(&grad_norms::<B, M>(module, &grads)?);
    let factor = max_norm / (norm + NORM_EPSILON);
    if factor < 1.0 {
        let mut scaler = GradScaler {
            grads: &mut grads,
            factor,
        };
        Module::<B>::visit(module, &mut scaler);
    }
    Ok((grads, norm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorCritic, ActorCriticConfig};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn model() -> ActorCritic<TestBackend> {
        ActorCriticConfig::new(4, vec![-1.0, -1.0], vec![1.0, 1.0])
            .with_hidden_dim(16)
            .init::<TestBackend>(&Default::default(), 3)
    }

    /// Gradients of a deliberately steep loss over every head.
    fn steep_grads(model: &ActorCritic<TestBackend>, scale: f32) -> GradientsParams {
        let device = Default::default();
        let obs = Tensor::<TestBackend, 2>::from_floats(
            [
                [0.5, -0.3, 0.8, 0.1],
                [-0.7, 0.2, 0.4, -0.9],
                [0.3, 0.6, -0.5, 0.2],
            ],
            &device,
        );
        let (mean, log_std, value) = model.forward(obs);
        let loss = (mean.sum() + log_std.sum() + value.sum()).mul_scalar(scale);
        GradientsParams::from_grads(loss.backward(), model)
    }

    #[test]
    fn test_global_norm_of_parts() {
        assert_eq!(global_norm(&[3.0, 4.0]), 5.0);
        assert_eq!(global_norm(&[]), 0.0);
    }

    #[test]
    fn test_buffers_have_no_gradient() {
        let model = model();
        let grads = steep_grads(&model, 1.0);
        let norms = grad_norms::<TestBackend, _>(&model, &grads).unwrap();

        // 5 layers × (weight, bias); action scale and bias are frozen
        assert_eq!(norms.len(), 10);
    }

    #[test]
    fn test_clips_global_norm_not_each_tensor() {
        let model = model();
        let max_norm = 0.5;
        let grads = steep_grads(&model, 100.0);

        let before = grad_norms::<TestBackend, _>(&model, &grads).unwrap();
        assert!(before.iter().filter(|&&n| n > max_norm).count() >= 2);

        let (clipped, reported) = clip_grad_norm::<TestBackend, _>(&model, grads, max_norm).unwrap();
        assert!((reported - global_norm(&before)).abs() <= 1e-3 * reported);

        let after = grad_norms::<TestBackend, _>(&model, &clipped).unwrap();
        assert!(global_norm(&after) <= max_norm + 1e-4, "norm {}", global_norm(&after));

        // Direction is preserved: every tensor shrinks by the same factor
        let factor = after[0] / before[0];
        for (a, b) in after.iter().zip(&before) {
            assert!((a - b * factor).abs() <= 1e-4 * b.max(1.0));
        }
    }

    #[test]
    fn test_small_gradients_are_untouched() {
        let model = model();
        let grads = steep_grads(&model, 1e-4);
        let before = grad_norms::<TestBackend, _>(&model, &grads).unwrap();
        assert!(global_norm(&before) < 10.0);

        let (clipped, _) = clip_grad_norm::<TestBackend, _>(&model, grads, 10.0).unwrap();
        let after = grad_norms::<TestBackend, _>(&model, &clipped).unwrap();
        assert_eq!(before, after);
    }
}
