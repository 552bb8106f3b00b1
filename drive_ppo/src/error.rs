//! Training error type.

use std::fmt;
use std::time::Duration;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::environment::EnvError;

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Errors that abort a training run.
#[derive(Debug)]
pub enum TrainError {
    /// Invalid configuration.
    Config(ConfigError),
    /// Environment failure inside a worker or evaluation.
    Env { worker_id: Option<usize>, source: EnvError },
    /// Checkpoint write or read failure.
    Checkpoint(CheckpointError),
    /// Weight snapshot could not be recorded or restored.
    Snapshot(String),
    /// Tensor data could not be read back.
    Tensor(String),
    /// Worker thread could not be started.
    WorkerSpawn { worker_id: usize, message: String },
    /// Not every worker delivered before the deadline.
    WorkerTimeout {
        received: usize,
        expected: usize,
        timeout: Duration,
    },
    /// Every worker exited but some never delivered.
    WorkersDisconnected { received: usize, expected: usize },
    /// Worker thread panicked.
    WorkerPanicked { worker_id: usize },
    /// Trajectory fields disagree in length or dimensionality.
    InvalidTrajectory { worker_id: usize, message: String },
    /// Assembled batch does not match `num_workers × steps_per_worker`.
    BatchSizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Invalid configuration: {}", e),
            Self::Env {
                worker_id: Some(id),
                source,
            } => write!(f, "Environment error in worker {}: {}", id, source),
            Self::Env {
                worker_id: None,
                source,
            } => write!(f, "Environment error: {}", source),
            Self::Checkpoint(e) => write!(f, "Checkpoint error: {}", e),
            Self::Snapshot(msg) => write!(f, "Snapshot error: {}", msg),
            Self::Tensor(msg) => write!(f, "Tensor data error: {}", msg),
            Self::WorkerSpawn { worker_id, message } => {
                write!(f, "Failed to spawn worker {}: {}", worker_id, message)
            }
            Self::WorkerTimeout {
                received,
                expected,
                timeout,
            } => write!(
                f,
                "Timed out after {:?} waiting for workers: received {}/{} trajectories",
                timeout, received, expected
            ),
            Self::WorkersDisconnected { received, expected } => write!(
                f,
                "Workers exited without delivering: received {}/{} trajectories",
                received, expected
            ),
            Self::WorkerPanicked { worker_id } => write!(f, "Worker {} panicked", worker_id),
            Self::InvalidTrajectory { worker_id, message } => {
                write!(f, "Invalid trajectory from worker {}: {}", worker_id, message)
            }
            Self::BatchSizeMismatch { expected, actual } => write!(
                f,
                "Batch size mismatch: expected {}, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for TrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Env { source, .. } => Some(source),
            Self::Checkpoint(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for TrainError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<EnvError> for TrainError {
    fn from(e: EnvError) -> Self {
        Self::Env {
            worker_id: None,
            source: e,
        }
    }
}

impl From<CheckpointError> for TrainError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}

/// Read a float tensor back into a flat `Vec<f32>`.
pub fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .into_vec::<f32>()
        .map_err(|e| TrainError::Tensor(format!("{:?}", e)))
}

/// Read a single-element tensor as an `f32`.
pub fn tensor_to_scalar<B: Backend>(tensor: Tensor<B, 1>) -> Result<f32> {
    tensor_to_vec(tensor)?
        .first()
        .copied()
        .ok_or_else(|| TrainError::Tensor("empty tensor".to_string()))
}
