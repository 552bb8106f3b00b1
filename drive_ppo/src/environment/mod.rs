//! Environment contract for rollout workers.
//!
//! A single (non-vectorized) episodic environment with a fixed observation
//! shape and a bounded continuous action box. Each rollout worker owns one
//! instance; nothing here needs to be `Sync`.

mod mock;

pub use mock::MockEnv;

use std::collections::BTreeMap;
use std::fmt;

/// Error raised by an environment.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvError {
    /// Environment could not be constructed.
    Creation(String),
    /// Action dimension mismatch
    ActionDimensionMismatch { expected: usize, actual: usize },
    /// Observation dimension mismatch
    ObservationDimensionMismatch { expected: usize, actual: usize },
    /// `step` was called before `reset`.
    NotReset,
    /// Environment was closed.
    Closed,
    /// Simulator-specific failure.
    Simulation(String),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creation(msg) => write!(f, "Failed to create environment: {}", msg),
            Self::ActionDimensionMismatch { expected, actual } => {
                write!(f, "Action dimension mismatch: expected {}, got {}", expected, actual)
            }
            Self::ObservationDimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Observation dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
            Self::NotReset => write!(f, "Environment stepped before reset"),
            Self::Closed => write!(f, "Environment is closed"),
            Self::Simulation(msg) => write!(f, "Simulation error: {}", msg),
        }
    }
}

impl std::error::Error for EnvError {}

/// Fixed observation shape declared by a scenario.
///
/// Observations are always delivered flattened in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationSpace {
    pub shape: Vec<usize>,
}

impl ObservationSpace {
    pub fn new(shape: Vec<usize>) -> Self {
        Self { shape }
    }

    /// Number of scalars in a flattened observation.
    pub fn flat_dim(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Bounded continuous action space.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl BoxSpace {
    /// Create a box. `low` and `high` must have equal length.
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Self {
        debug_assert_eq!(low.len(), high.len(), "BoxSpace bounds must have equal length");
        Self { low, high }
    }

    /// Symmetric box `[-bound, bound]^dim`.
    pub fn symmetric(dim: usize, bound: f32) -> Self {
        Self::new(vec![-bound; dim], vec![bound; dim])
    }

    pub fn dim(&self) -> usize {
        self.low.len()
    }
}

/// Auxiliary per-step information. Not used by training.
pub type EnvInfo = BTreeMap<String, f32>;

/// Result of a single environment step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Observation after the step (flattened)
    pub observation: Vec<f32>,
    pub reward: f32,
    /// Episode ended due to goal/failure
    pub terminated: bool,
    /// Episode ended due to time limit
    pub truncated: bool,
    pub info: EnvInfo,
}

impl StepOutcome {
    /// Episode ended for either reason.
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// A single episodic environment with a continuous action box.
pub trait Environment {
    /// Declared observation shape.
    fn observation_space(&self) -> &ObservationSpace;

    /// Declared action bounds.
    fn action_space(&self) -> &BoxSpace;

    /// Start a new episode. `Some(seed)` reseeds the environment's RNG.
    fn reset(&mut self, seed: Option<u64>) -> Result<(Vec<f32>, EnvInfo), EnvError>;

    /// Advance one step with an action inside `action_space()`.
    fn step(&mut self, action: &[f32]) -> Result<StepOutcome, EnvError>;

    /// Release simulator resources. Default is a no-op.
    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_dim() {
        assert_eq!(ObservationSpace::new(vec![5, 7]).flat_dim(), 35);
        assert_eq!(ObservationSpace::new(vec![3]).flat_dim(), 3);
    }

    #[test]
    fn test_step_outcome_done() {
        let mut outcome = StepOutcome {
            observation: vec![],
            reward: 0.0,
            terminated: false,
            truncated: false,
            info: EnvInfo::new(),
        };
        assert!(!outcome.done());
        outcome.truncated = true;
        assert!(outcome.done());
    }
}
