//! Trailing-window episode statistics for reporting.

use std::collections::VecDeque;

/// Default number of recent episodes kept.
pub const EPISODE_WINDOW: usize = 100;

/// Rewards and lengths of the most recent completed episodes.
#[derive(Debug, Clone)]
pub struct EpisodeStats {
    rewards: VecDeque<f32>,
    lengths: VecDeque<usize>,
    capacity: usize,
    total_episodes: usize,
}

impl EpisodeStats {
    pub fn new() -> Self {
        Self::with_capacity(EPISODE_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rewards: VecDeque::with_capacity(capacity),
            lengths: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
        }
    }

    /// Record one completed episode, evicting the oldest when full.
    pub fn record(&mut self, reward: f32, length: usize) {
        if self.rewards.len() == self.capacity {
            self.rewards.pop_front();
            self.lengths.pop_front();
        }
        self.rewards.push_back(reward);
        self.lengths.push_back(length);
        self.total_episodes += 1;
    }

    /// Mean reward over the window, 0 when empty.
    pub fn mean_reward(&self) -> f32 {
        if self.rewards.is_empty() {
            return 0.0;
        }
        self.rewards.iter().sum::<f32>() / self.rewards.len() as f32
    }

    /// Mean length over the window, 0 when empty.
    pub fn mean_length(&self) -> f32 {
        if self.lengths.is_empty() {
            return 0.0;
        }
        self.lengths.iter().sum::<usize>() as f32 / self.lengths.len() as f32
    }

    /// Episodes recorded since creation, including evicted ones.
    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    /// Episodes currently in the window.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

impl Default for EpisodeStats {
    fn default() -> Self {
        Self::new()
    }
}
