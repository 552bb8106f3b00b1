//! Deterministic mock environment for testing workers and the trainer.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::{BoxSpace, EnvError, EnvInfo, Environment, ObservationSpace, StepOutcome};

/// Simple deterministic environment.
///
/// The state is a vector that drifts by the action each step. The reward is
/// the negative squared distance of the action from a fixed target, so a
/// policy can make progress on it. Episodes truncate after `episode_length`
/// steps, or terminate early when `terminate_every` is set.
#[derive(Debug, Clone)]
pub struct MockEnv {
    observation_space: ObservationSpace,
    action_space: BoxSpace,
    episode_length: usize,
    terminate_every: Option<usize>,
    fail_at_step: Option<usize>,
    state: Vec<f32>,
    target: Vec<f32>,
    steps: usize,
    total_steps: usize,
    resets: usize,
    is_reset: bool,
    rng: Xoshiro256PlusPlus,
}

impl MockEnv {
    /// Create a mock with the given observation shape and action box.
    pub fn new(obs_shape: Vec<usize>, action_space: BoxSpace, episode_length: usize) -> Self {
        let obs_dim: usize = obs_shape.iter().product();
        let target = (0..action_space.dim())
            .map(|i| {
                let mid = 0.5 * (action_space.low[i] + action_space.high[i]);
                let half = 0.5 * (action_space.high[i] - action_space.low[i]);
                mid + 0.5 * half
            })
            .collect();
        Self {
            observation_space: ObservationSpace::new(obs_shape),
            action_space,
            episode_length: episode_length.max(1),
            terminate_every: None,
            fail_at_step: None,
            state: vec![0.0; obs_dim],
            target,
            steps: 0,
            total_steps: 0,
            resets: 0,
            is_reset: false,
            rng: Xoshiro256PlusPlus::seed_from_u64(0),
        }
    }

    /// Mock shaped like the driving scenario: (5, 7) observations, 2-d actions in [-1, 1].
    pub fn driving_like(episode_length: usize) -> Self {
        Self::new(vec![5, 7], BoxSpace::symmetric(2, 1.0), episode_length)
    }

    /// Terminate (not truncate) every `n` steps.
    pub fn with_terminate_every(mut self, n: usize) -> Self {
        self.terminate_every = Some(n.max(1));
        self
    }

    /// Return a simulation error on the given step (counted across episodes, 1-based).
    pub fn with_fail_at_step(mut self, step: usize) -> Self {
        self.fail_at_step = Some(step);
        self
    }

    /// Number of times `reset` has been called.
    pub fn reset_count(&self) -> usize {
        self.resets
    }

    /// Steps taken across all episodes.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    fn observation(&self) -> Vec<f32> {
        let progress = self.steps as f32 / self.episode_length as f32;
        self.state
            .iter()
            .enumerate()
            .map(|(i, &s)| if i == 0 { progress } else { s })
            .collect()
    }
}

impl Environment for MockEnv {
    fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(Vec<f32>, EnvInfo), EnvError> {
        if let Some(seed) = seed {
            self.rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        }
        for s in self.state.iter_mut() {
            *s = self.rng.gen_range(-0.1..0.1);
        }
        self.steps = 0;
        self.resets += 1;
        self.is_reset = true;
        Ok((self.observation(), EnvInfo::new()))
    }

    fn step(&mut self, action: &[f32]) -> Result<StepOutcome, EnvError> {
        if !self.is_reset {
            return Err(EnvError::NotReset);
        }
        if action.len() != self.action_space.dim() {
            return Err(EnvError::ActionDimensionMismatch {
                expected: self.action_space.dim(),
                actual: action.len(),
            });
        }

        self.steps += 1;
        self.total_steps += 1;
        if self.fail_at_step == Some(self.total_steps) {
            return Err(EnvError::Simulation(format!(
                "mock failure at step {}",
                self.total_steps
            )));
        }

        let n = self.state.len();
        for (i, &a) in action.iter().enumerate() {
            if n > 1 {
                let idx = 1 + i % (n - 1);
                self.state[idx] = (self.state[idx] + 0.1 * a).clamp(-1.0, 1.0);
            }
        }

        let reward = -action
            .iter()
            .zip(self.target.iter())
            .map(|(&a, &t)| (a - t) * (a - t))
            .sum::<f32>();

        let terminated = self
            .terminate_every
            .map_or(false, |k| self.steps % k == 0 && self.steps < self.episode_length);
        let truncated = !terminated && self.steps >= self.episode_length;
        if terminated || truncated {
            self.is_reset = false;
        }

        let mut info = EnvInfo::new();
        info.insert("step".to_string(), self.steps as f32);

        Ok(StepOutcome {
            observation: self.observation(),
            reward,
            terminated,
            truncated,
            info,
        })
    }
}
