//! Batch assembly from per-worker trajectories.
//!
//! GAE runs on each trajectory on its own, because the bootstrap value is
//! trajectory-local. Only then are the arrays concatenated.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::algorithms::gae::compute_gae;
use crate::error::{Result, TrainError};
use crate::rollout::Trajectory;

/// Training data for one iteration, flattened across workers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// [N * obs_dim]
    pub observations: Vec<f32>,
    /// [N * action_dim]
    pub actions: Vec<f32>,
    /// Log-probs recorded by the sampling policy: [N]
    pub old_log_probs: Vec<f32>,
    /// Raw (unnormalized) GAE advantages: [N]
    pub advantages: Vec<f32>,
    /// `advantages + values`: [N]
    pub returns: Vec<f32>,
    pub obs_dim: usize,
    pub action_dim: usize,
}

impl Batch {
    /// Number of transitions.
    pub fn len(&self) -> usize {
        self.old_log_probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.old_log_probs.is_empty()
    }

    /// Copy the rows listed in `indices` into a minibatch.
    pub fn select(&self, indices: &[usize]) -> Batch {
        let obs_dim = self.obs_dim;
        let action_dim = self.action_dim;
        Batch {
            observations: indices
                .iter()
                .flat_map(|&i| &self.observations[i * obs_dim..(i + 1) * obs_dim])
                .copied()
                .collect(),
            actions: indices
                .iter()
                .flat_map(|&i| &self.actions[i * action_dim..(i + 1) * action_dim])
                .copied()
                .collect(),
            old_log_probs: indices.iter().map(|&i| self.old_log_probs[i]).collect(),
            advantages: indices.iter().map(|&i| self.advantages[i]).collect(),
            returns: indices.iter().map(|&i| self.returns[i]).collect(),
            obs_dim,
            action_dim,
        }
    }
}

/// Accumulates trajectories into a [`Batch`].
#[derive(Debug)]
pub struct BatchBuilder {
    batch: Batch,
}

impl BatchBuilder {
    pub fn new(obs_dim: usize, action_dim: usize) -> Self {
        Self {
            batch: Batch {
                obs_dim,
                action_dim,
                ..Batch::default()
            },
        }
    }

    /// Run GAE on `trajectory` and append it.
    pub fn push(&mut self, trajectory: &Trajectory, gamma: f32, gae_lambda: f32) -> Result<()> {
        if trajectory.obs_dim != self.batch.obs_dim || trajectory.action_dim != self.batch.action_dim {
            return Err(TrainError::InvalidTrajectory {
                worker_id: trajectory.worker_id,
                message: format!(
                    "dimensions ({}, {}) do not match batch ({}, {})",
                    trajectory.obs_dim, trajectory.action_dim, self.batch.obs_dim, self.batch.action_dim
                ),
            });
        }
        trajectory.validate(trajectory.len())?;

        let (advantages, returns) = compute_gae(
            &trajectory.rewards,
            &trajectory.values,
            &trajectory.dones,
            trajectory.last_value,
            trajectory.last_done,
            gamma,
            gae_lambda,
        );

        let batch = &mut self.batch;
        batch.observations.extend_from_slice(&trajectory.observations);
        batch.actions.extend_from_slice(&trajectory.actions);
        batch.old_log_probs.extend_from_slice(&trajectory.log_probs);
        batch.advantages.extend(advantages);
        batch.returns.extend(returns);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Finish the batch, checking it holds exactly `expected` transitions.
    pub fn build(self, expected: usize) -> Result<Batch> {
        if self.batch.len() != expected {
            return Err(TrainError::BatchSizeMismatch {
                expected,
                actual: self.batch.len(),
            });
        }
        Ok(self.batch)
    }
}

/// Shuffle `0..len` and cut it into chunks of `minibatch_size`.
///
/// Every index lands in exactly one chunk; only the last chunk may be
/// shorter.
pub fn minibatch_indices<R: Rng>(len: usize, minibatch_size: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices
        .chunks(minibatch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}
