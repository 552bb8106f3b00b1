//! Tests for the algorithms module.
//!
//! - `gae_tests`: Generalized Advantage Estimation
//! - `squashed_gaussian_tests`: squashed Gaussian sampling and log-probabilities

pub mod squashed_gaussian_tests;
