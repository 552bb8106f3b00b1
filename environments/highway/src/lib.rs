//! Car-following highway scenario for `drive_ppo`.
//!
//! A single ego vehicle drives behind an IDM-controlled lead vehicle on a
//! straight multi-lane road, with optional IDM traffic in the other lanes.
//! The ego is steered through a kinematic bicycle model; everything else
//! keeps its lane.
//!
//! # Spaces
//!
//! - Observation: `[5, 7]` kinematics rows (ego first, then the nearest
//!   four vehicles), see [`observation`].
//! - Action: `[throttle/brake, steering]` in `[-1, 1]²`.
//!
//! # Example
//!
//! ```rust,ignore
//! use drive_ppo::Environment;
//! use highway_env::{CarFollowing, CarFollowingConfig};
//!
//! let mut env = CarFollowing::new(CarFollowingConfig::default().with_traffic(4))?;
//! let (obs, _) = env.reset(Some(7))?;
//! let outcome = env.step(&[0.5, 0.0])?;
//! ```

pub mod config;
pub mod env;
pub mod idm;
pub mod observation;
pub mod vehicle;

#[cfg(test)]
mod tests;

pub use config::{CarFollowingConfig, RewardConfig};
pub use env::CarFollowing;
pub use idm::{idm_acceleration, IdmParams, Leader};
pub use observation::{observe, FEATURES, OBSERVATION_SHAPE, OBSERVED_VEHICLES};
pub use vehicle::{Vehicle, VEHICLE_LENGTH, VEHICLE_WIDTH};
