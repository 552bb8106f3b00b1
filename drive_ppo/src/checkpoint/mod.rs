//! Model checkpointing.
//!
//! One file per scenario, `<model_dir>/ppo_<scenario>_model.bin`,
//! overwritten as training progresses.
//!
//! ## Example
//!
//! ```rust,ignore
//! use drive_ppo::checkpoint::Checkpointer;
//!
//! let checkpointer = Checkpointer::new("models", "idm", 1)?;
//!
//! // In training loop:
//! if checkpointer.should_save(iteration) {
//!     checkpointer.save(&model)?;
//! }
//!
//! // Evaluation or resume:
//! let model = checkpointer.load(template, &device)?;
//! ```

pub mod checkpointer;

pub use checkpointer::{load_checkpoint, CheckpointError, Checkpointer};
