//! Actor-critic model.

pub mod actor_critic;

pub use actor_critic::{ActorCritic, ActorCriticConfig, LOG_STD_MAX, LOG_STD_MIN};
