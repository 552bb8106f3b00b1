//! Fixed-length per-worker trajectories.

use crate::error::{Result, TrainError};

/// One environment step as recorded by a worker.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Flattened observation the action was taken from
    pub observation: Vec<f32>,
    /// Action sent to the environment
    pub action: Vec<f32>,
    /// Log-probability of `action` under the sampling policy
    pub log_prob: f32,
    pub reward: f32,
    /// Episode terminated or truncated after this step
    pub done: bool,
    /// V(observation) under the sampling policy
    pub value: f32,
}

/// Ordered transitions collected by one worker in one iteration.
///
/// Stored as flat parallel arrays. Episode boundaries may fall anywhere
/// inside; `dones[t]` marks the last step of an episode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub worker_id: usize,
    pub obs_dim: usize,
    pub action_dim: usize,
    /// [T * obs_dim]
    pub observations: Vec<f32>,
    /// [T * action_dim]
    pub actions: Vec<f32>,
    pub log_probs: Vec<f32>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub values: Vec<f32>,
    /// Bootstrap value of the observation after the last step
    pub last_value: f32,
    /// The observation after the last step starts a fresh episode
    pub last_done: bool,
}

impl Trajectory {
    /// Create an empty trajectory with room for `capacity` steps.
    pub fn with_capacity(worker_id: usize, obs_dim: usize, action_dim: usize, capacity: usize) -> Self {
        Self {
            worker_id,
            obs_dim,
            action_dim,
            observations: Vec::with_capacity(capacity * obs_dim),
            actions: Vec::with_capacity(capacity * action_dim),
            log_probs: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            dones: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            last_value: 0.0,
            last_done: false,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        self.observations.extend_from_slice(&transition.observation);
        self.actions.extend_from_slice(&transition.action);
        self.log_probs.push(transition.log_prob);
        self.rewards.push(transition.reward);
        self.dones.push(transition.done);
        self.values.push(transition.value);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Check that every field holds exactly `expected_len` steps.
    pub fn validate(&self, expected_len: usize) -> Result<()> {
        let checks = [
            ("observations", self.observations.len(), expected_len * self.obs_dim),
            ("actions", self.actions.len(), expected_len * self.action_dim),
            ("log_probs", self.log_probs.len(), expected_len),
            ("rewards", self.rewards.len(), expected_len),
            ("dones", self.dones.len(), expected_len),
            ("values", self.values.len(), expected_len),
        ];
        for (field, actual, expected) in checks {
            if actual != expected {
                return Err(TrainError::InvalidTrajectory {
                    worker_id: self.worker_id,
                    message: format!("{} has {} entries, expected {}", field, actual, expected),
                });
            }
        }
        Ok(())
    }

    /// Episodes completed inside this trajectory as `(total_reward, length)`.
    ///
    /// Every trajectory starts on a fresh episode; a trailing unfinished
    /// episode is not reported.
    pub fn completed_episodes(&self) -> Vec<(f32, usize)> {
        let mut episodes = Vec::new();
        let mut reward = 0.0f32;
        let mut length = 0usize;
        for (&r, &done) in self.rewards.iter().zip(&self.dones) {
            reward += r;
            length += 1;
            if done {
                episodes.push((reward, length));
                reward = 0.0;
                length = 0;
            }
        }
        episodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(reward: f32, done: bool) -> Transition {
        Transition {
            observation: vec![0.0, 1.0, 2.0],
            action: vec![0.5],
            log_prob: -1.0,
            reward,
            done,
            value: 0.0,
        }
    }

    #[test]
    fn test_push_and_validate() {
        let mut traj = Trajectory::with_capacity(2, 3, 1, 4);
        for _ in 0..4 {
            traj.push(transition(1.0, false));
        }
        assert_eq!(traj.len(), 4);
        assert_eq!(traj.observations.len(), 12);
        assert!(traj.validate(4).is_ok());

        let err = traj.validate(5).unwrap_err();
        assert!(matches!(err, TrainError::InvalidTrajectory { worker_id: 2, .. }));
    }

    #[test]
    fn test_completed_episodes() {
        let mut traj = Trajectory::with_capacity(0, 3, 1, 6);
        traj.push(transition(1.0, false));
        traj.push(transition(2.0, true));
        traj.push(transition(0.5, true));
        traj.push(transition(1.0, false));
        traj.push(transition(1.0, false));

        assert_eq!(traj.completed_episodes(), vec![(3.0, 2), (0.5, 1)]);
    }
}
