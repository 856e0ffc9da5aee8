//! Execution state models

use crate::execution::StepFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// All steps succeeded
    Completed,
    /// A step failed and the run stopped
    Failed,
}

/// Outcome of a single step
#[derive(Debug)]
pub enum StepOutcome {
    Success,
    Failure(StepFailure),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }
}

/// Outcome of a whole run
#[derive(Debug)]
pub enum RunOutcome {
    /// Every step completed
    Succeeded,
    /// The run stopped at the first failing step
    Failed(StepFailure),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }

    /// The failure that stopped the run, if any
    pub fn failure(&self) -> Option<&StepFailure> {
        match self {
            RunOutcome::Succeeded => None,
            RunOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Position of a run in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Running { step_index: usize },
    Succeeded,
    Failed { step_name: String, cause: String },
}

/// Bookkeeping for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current lifecycle state
    pub state: RunState,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of steps
    pub total_steps: usize,

    /// Number of completed steps
    pub completed_steps: usize,
}

impl PipelineState {
    /// Create a new pipeline state
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            state: RunState::Pending,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
        }
    }

    /// Mark pipeline as started
    pub fn start(&mut self, total_steps: usize) {
        self.started_at = Some(Utc::now());
        self.total_steps = total_steps;
    }

    /// Enter the step at `step_index`
    pub fn enter_step(&mut self, step_index: usize) {
        self.state = RunState::Running { step_index };
    }

    /// Record that the current step completed
    pub fn step_completed(&mut self) {
        self.completed_steps += 1;
    }

    /// Mark pipeline as completed
    pub fn complete(&mut self) {
        self.state = RunState::Succeeded;
        self.completed_at = Some(Utc::now());
    }

    /// Mark pipeline as failed
    pub fn fail(&mut self, failure: &StepFailure) {
        self.state = RunState::Failed {
            step_name: failure.step_name.clone(),
            cause: failure.cause.to_string(),
        };
        self.completed_at = Some(Utc::now());
    }

    pub fn status(&self) -> ExecutionStatus {
        match self.state {
            RunState::Pending => ExecutionStatus::Pending,
            RunState::Running { .. } => ExecutionStatus::Running,
            RunState::Succeeded => ExecutionStatus::Completed,
            RunState::Failed { .. } => ExecutionStatus::Failed,
        }
    }

    /// Calculate progress percentage (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.completed_steps as f64 / self.total_steps as f64
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
