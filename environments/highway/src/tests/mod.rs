//! Scenario-level tests for the car-following environment.
//!
//! - `env_tests`: environment contract (spaces, reset, errors)
//! - `episode_tests`: termination, truncation and reward

mod episode_tests;
