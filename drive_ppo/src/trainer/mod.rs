//! Training orchestration.
//!
//! [`PpoTrainer`] owns the learner model and optimizer and drives the
//! iteration state machine: snapshot, fan out, gather, GAE, update,
//! report, checkpoint.

pub mod ppo_trainer;


pub use ppo_trainer::{PpoTrainer, TrainingOutcome};
