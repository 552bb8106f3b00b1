//! Learner side of an iteration: batch assembly, gradient clipping and
//! the PPO update.

pub mod batch;
pub mod grad_norm;
pub mod ppo_update;

pub use batch::{minibatch_indices, Batch, BatchBuilder};
pub use grad_norm::{clip_grad_norm, global_norm, grad_norms};
pub use ppo_update::{ppo_update, UpdateStats};
