//! Fixed-path model checkpointing.

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Error type for checkpointing operations.
#[derive(Debug)]
pub enum CheckpointError {
    /// IO error during save/load.
    Io(io::Error),
    /// Burn recorder error.
    Recorder(String),
    /// Checkpoint file does not exist.
    NotFound(PathBuf),
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "IO error: {}", e),
            CheckpointError::Recorder(e) => write!(f, "Recorder error: {}", e),
            CheckpointError::NotFound(path) => {
                write!(f, "Checkpoint not found: {}", path.display())
            }
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// Writes the full parameter set to `<model_dir>/ppo_<scenario>_model.bin`.
///
/// The same file is overwritten on every save, so the file always holds the
/// most recent parameters.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    path: PathBuf,
    interval: usize,
}

impl Checkpointer {
    /// Create a checkpointer, creating `model_dir` if needed.
    ///
    /// An already existing directory is fine.
    pub fn new(
        model_dir: impl AsRef<Path>,
        scenario_name: &str,
        interval: usize,
    ) -> Result<Self, CheckpointError> {
        let model_dir = model_dir.as_ref();
        fs::create_dir_all(model_dir)?;

        Ok(Self {
            path: Self::checkpoint_path(model_dir, scenario_name),
            interval: interval.max(1),
        })
    }

    /// Checkpoint path for a scenario inside `model_dir`.
    pub fn checkpoint_path(model_dir: impl AsRef<Path>, scenario_name: &str) -> PathBuf {
        model_dir
            .as_ref()
            .join(format!("ppo_{}_model.bin", scenario_name))
    }

    /// Path written by [`save`](Self::save).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a 1-based iteration is a checkpoint iteration.
    pub fn should_save(&self, iteration: usize) -> bool {
        iteration > 0 && iteration % self.interval == 0
    }

    /// Save a model, overwriting the previous checkpoint.
    pub fn save<B: Backend, M: Module<B>>(&self, model: &M) -> Result<PathBuf, CheckpointError> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        model
            .clone()
            .save_file(&self.path, &recorder)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))?;
        debug!(path = %self.path.display(), "checkpoint written");
        Ok(self.path.clone())
    }

    /// Load the checkpoint into a model template.
    ///
    /// The template is typically created with `ActorCriticConfig::init`.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        model_template: M,
        device: &B::Device,
    ) -> Result<M, CheckpointError> {
        load_checkpoint(model_template, &self.path, device)
    }
}

/// Load a model from an explicit checkpoint file.
pub fn load_checkpoint<B: Backend, M: Module<B>>(
    model_template: M,
    path: &Path,
    device: &B::Device,
) -> Result<M, CheckpointError> {
    if !path.exists() {
        return Err(CheckpointError::NotFound(path.to_path_buf()));
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model_template
        .load_file(path, &recorder, device)
        .map_err(|e| CheckpointError::Recorder(e.to_string()))
}
