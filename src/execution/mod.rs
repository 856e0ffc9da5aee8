//! Pipeline execution engine

pub mod engine;
pub mod executor;

pub use engine::{EventHandler, ExecutionEvent, PipelineRunner};
pub use executor::StepExecutor;

use crate::container::BackendError;
use crate::secrets::SecretError;
use thiserror::Error;

/// Why a step failed
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Secrets(#[from] SecretError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("container exited with {}", exit_label(.0))]
    NonZeroExit(Option<i32>),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// A step failure attributed to the step that produced it
#[derive(Debug, Error)]
#[error("step {step_name} failed: {cause}")]
pub struct StepFailure {
    pub step_name: String,

    /// Zero-based position of the step in the pipeline
    pub step_index: usize,

    #[source]
    pub cause: StepError,
}

impl StepFailure {
    pub fn new(step_name: impl Into<String>, step_index: usize, cause: StepError) -> Self {
        Self {
            step_name: step_name.into(),
            step_index,
            cause,
        }
    }
}
