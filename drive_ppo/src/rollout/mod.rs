//! Rollout collection for PPO.
//!
//! - `ModelSnapshot`: Serialized weights handed to each worker by value
//! - `Trajectory`: Fixed-length record of one worker's steps
//! - `collect_trajectory` / `spawn_worker`: One worker, one OS thread
//! - `collect_rollouts`: Fan out a round of workers and gather their results
//! - `evaluate_policy`: Deterministic episodes for reporting
//!
//! Workers never share a model or an environment with anyone. The learner
//! serializes its weights once per iteration, every worker restores a
//! private copy, and results come back over a bounded channel.
//!
//! Workers are OS threads inside the learner process. A worker panic is
//! caught and reported, but a hard simulator crash (an abort in foreign
//! code, a segfault) takes the learner down with it.

pub mod evaluation;
pub mod gather;
pub mod snapshot;
pub mod trajectory;
pub mod worker;


pub use evaluation::{evaluate_policy, EpisodeResult};
pub use gather::{collect_rollouts, gather_trajectories, join_workers};
pub use snapshot::ModelSnapshot;
pub use trajectory::{Trajectory, Transition};
pub use worker::{collect_trajectory, run_worker, spawn_worker, WorkerMessage, WorkerTask};
