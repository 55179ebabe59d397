pub mod lifecycle;
pub mod observer;
pub mod runner;
pub mod state;

pub use lifecycle::*;
pub use observer::*;
pub use runner::*;
pub use state::*;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::pipeline::stage::StageError;
use crate::pipeline::trigger::StorageError;

/// Fatal pipeline errors: the only failures that move a run to ERROR/FAILED.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}
