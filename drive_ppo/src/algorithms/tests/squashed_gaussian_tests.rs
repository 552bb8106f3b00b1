//! Tests for the squashed Gaussian policy distribution.
//!
//! The key property: the learner's batched log-probability, fed the exact
//! action produced by the worker's sampler, reproduces the recorded
//! log-probability.

use burn::backend::NdArray;
use burn::tensor::Tensor;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::algorithms::squashed_gaussian::{
    gaussian_entropy, sample_squashed, squashed_log_prob, squashed_log_prob_scalar,
};

type TestBackend = NdArray<f32>;

fn row(values: &[f32]) -> Tensor<TestBackend, 2> {
    let device = Default::default();
    Tensor::<TestBackend, 1>::from_floats(values, &device).reshape([1, values.len()])
}

fn rows(values: &[Vec<f32>]) -> Tensor<TestBackend, 2> {
    let device = Default::default();
    let dim = values[0].len();
    let flat: Vec<f32> = values.iter().flatten().copied().collect();
    Tensor::<TestBackend, 1>::from_floats(flat.as_slice(), &device).reshape([values.len(), dim])
}

fn to_vec(tensor: Tensor<TestBackend, 1>) -> Vec<f32> {
    tensor.into_data().as_slice::<f32>().unwrap().to_vec()
}

#[test]
fn test_samples_stay_in_bounds() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let scale = [1.0, 2.5];
    let bias = [0.0, 1.5];
    for _ in 0..500 {
        let sample = sample_squashed(&[3.0, -3.0], &[1.5, 1.5], &scale, &bias, &mut rng);
        assert!(sample.action[0] >= -1.0 && sample.action[0] <= 1.0);
        assert!(sample.action[1] >= -1.0 && sample.action[1] <= 4.0);
        assert!(sample.log_prob.is_finite());
    }
}

#[test]
fn test_sampling_is_deterministic_per_seed() {
    let mut a = Xoshiro256PlusPlus::seed_from_u64(42);
    let mut b = Xoshiro256PlusPlus::seed_from_u64(42);
    for _ in 0..10 {
        let sa = sample_squashed(&[0.1, -0.2], &[-0.5, 0.0], &[1.0, 1.0], &[0.0, 0.0], &mut a);
        let sb = sample_squashed(&[0.1, -0.2], &[-0.5, 0.0], &[1.0, 1.0], &[0.0, 0.0], &mut b);
        assert_eq!(sa, sb);
    }
}

/// Recorded log-prob at sampling time equals the learner's recomputation.
#[test]
fn test_recomputed_log_prob_matches_recorded() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let scale = [1.0, 2.0];
    let bias = [0.0, 2.0];

    let cases: Vec<(Vec<f32>, Vec<f32>)> = vec![
        (vec![0.0, 0.0], vec![0.0, 0.0]),
        (vec![0.5, -0.3], vec![-1.0, -0.5]),
        (vec![-1.2, 0.8], vec![-2.0, 0.3]),
        (vec![1.5, -1.5], vec![-4.0, -3.0]),
    ];

    for (mean, log_std) in cases {
        let mut actions = Vec::new();
        let mut recorded = Vec::new();
        for _ in 0..16 {
            let sample = sample_squashed(&mean, &log_std, &scale, &bias, &mut rng);
            actions.push(sample.action);
            recorded.push(sample.log_prob);
        }

        let n = actions.len();
        let means = vec![mean.clone(); n];
        let log_stds = vec![log_std.clone(); n];
        let recomputed = to_vec(squashed_log_prob(
            rows(&actions),
            rows(&means),
            rows(&log_stds),
            row(&scale),
            row(&bias),
        ));

        for (r, c) in recorded.iter().zip(recomputed.iter()) {
            assert!(
                (r - c).abs() <= 1e-3 * (1.0 + r.abs()),
                "recorded {} vs recomputed {} (mean {:?}, log_std {:?})",
                r,
                c,
                mean,
                log_std
            );
        }
    }
}

/// With unit scale and zero bias the density matches the textbook formula
/// log N(x; μ, σ) − log(1 − tanh²(x)) up to the epsilon guard.
#[test]
fn test_log_prob_matches_change_of_variables() {
    let mean = 0.3f64;
    let log_std = -0.2f64;
    let x = 0.7f64;
    let a = x.tanh();

    let std = log_std.exp();
    let z = (x - mean) / std;
    let gaussian = -0.5 * z * z - log_std - 0.5 * (2.0 * std::f64::consts::PI).ln();
    let expected = gaussian - (1.0 - a * a + 1e-6).ln();

    let scalar = squashed_log_prob_scalar(&[a as f32], &[mean as f32], &[log_std as f32], &[1.0], &[0.0]);
    assert!((scalar as f64 - expected).abs() < 1e-4);

    let tensor = to_vec(squashed_log_prob(
        row(&[a as f32]),
        row(&[mean as f32]),
        row(&[log_std as f32]),
        row(&[1.0]),
        row(&[0.0]),
    ));
    assert!((tensor[0] as f64 - expected).abs() < 1e-4);
}

/// The squash correction accounts for action_scale.
#[test]
fn test_scale_shifts_log_prob_by_log_scale() {
    let unit = squashed_log_prob_scalar(&[0.2], &[0.0], &[0.0], &[1.0], &[0.0]);
    let scaled = squashed_log_prob_scalar(&[0.6], &[0.0], &[0.0], &[3.0], &[0.0]);
    // Same y = 0.2; density in a-space shrinks by the Jacobian factor 3
    assert!((unit - scaled - 3.0f32.ln()).abs() < 1e-4);
}

/// Actions at the box boundary stay finite thanks to the clamp.
#[test]
fn test_boundary_actions_are_finite() {
    let log_probs = to_vec(squashed_log_prob(
        rows(&[vec![1.0, -1.0], vec![-1.0, 1.0]]),
        rows(&[vec![0.0, 0.0], vec![0.0, 0.0]]),
        rows(&[vec![0.0, 0.0], vec![0.0, 0.0]]),
        row(&[1.0, 1.0]),
        row(&[0.0, 0.0]),
    ));
    assert!(log_probs.iter().all(|lp| lp.is_finite()));
}

/// Saturated draws are scored at the clamped action, not at the raw draw.
#[test]
fn test_saturated_samples_score_the_clamped_action() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    let mean = [0.0];
    let log_std = [2.0];
    let mut saturated = Vec::new();
    for _ in 0..200 {
        let sample = sample_squashed(&mean, &log_std, &[1.0], &[0.0], &mut rng);
        assert!(sample.log_prob.is_finite());
        if sample.action[0].abs() == 1.0 {
            saturated.push(sample);
        }
    }
    // σ = e² puts a large share of draws past tanh's f32 saturation
    assert!(!saturated.is_empty());

    let at_boundary = squashed_log_prob_scalar(&[1.0], &mean, &log_std, &[1.0], &[0.0]);
    for sample in &saturated {
        let expected = squashed_log_prob_scalar(&sample.action, &mean, &log_std, &[1.0], &[0.0]);
        assert_eq!(sample.log_prob, expected);
        assert!((sample.log_prob.abs() - at_boundary.abs()).abs() < 1e-4);
    }
}

#[test]
fn test_gaussian_entropy() {
    let entropy = to_vec(gaussian_entropy(rows(&[vec![0.0, -1.0], vec![1.0, 0.0]])));
    let per_dim_const = 0.5 + 0.5 * (2.0 * std::f32::consts::PI).ln();
    // mean log_std is 0
    assert_eq!(entropy.len(), 1);
    assert!((entropy[0] - per_dim_const).abs() < 1e-5);
}
