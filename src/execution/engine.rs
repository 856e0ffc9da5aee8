//! Pipeline runner - drives steps in order and stops at the first failure

use crate::{
    container::ContainerBackend,
    core::{ExecutionStatus, PipelineDefinition, PipelineState, RunOutcome, StepOutcome},
    execution::StepExecutor,
    secrets::{SecretError, SecretResolver, SecretStore},
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        index: usize,
        total: usize,
        step_name: String,
    },
    StepCompleted {
        index: usize,
        step_name: String,
    },
    StepFailed {
        index: usize,
        step_name: String,
        error: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
        completed_steps: usize,
        total_steps: usize,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Runs a pipeline's steps sequentially, fail-fast
pub struct PipelineRunner<S, B> {
    executor: StepExecutor<S, B>,
    event_handlers: Vec<EventHandler>,
}

impl<S: SecretStore, B: ContainerBackend> PipelineRunner<S, B> {
    pub fn new(resolver: SecretResolver<S>, backend: B) -> Self {
        Self::from_executor(StepExecutor::new(resolver, backend))
    }

    pub fn from_executor(executor: StepExecutor<S, B>) -> Self {
        Self {
            executor,
            event_handlers: Vec::new(),
        }
    }

    pub fn executor(&self) -> &StepExecutor<S, B> {
        &self.executor
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Execute the entire pipeline
    ///
    /// Steps run in declared order. The first failing step ends the run and
    /// is reported as [`RunOutcome::Failed`]; later steps are never started.
    /// `Err` is returned only when the secret store credential is missing, in
    /// which case no step is attempted.
    pub async fn run(&self, pipeline: &PipelineDefinition) -> Result<RunOutcome, SecretError> {
        self.executor.resolver().ensure_credential().inspect_err(|e| {
            error!("Cannot start pipeline {}: {}", pipeline.name, e);
        })?;

        let mut state = PipelineState::new();
        let total = pipeline.steps.len();
        state.start(total);

        info!("Starting pipeline execution: {} ({})", pipeline.name, state.execution_id);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id: state.execution_id,
            pipeline_name: pipeline.name.clone(),
            total_steps: total,
        });

        for (index, step) in pipeline.steps.iter().enumerate() {
            state.enter_step(index);
            self.emit_event(ExecutionEvent::StepStarted {
                index,
                total,
                step_name: step.name.clone(),
            });

            let outcome = self
                .executor
                .execute(index, step, &pipeline.setup_commands, &pipeline.env)
                .await;

            match outcome {
                StepOutcome::Success => {
                    state.step_completed();
                    self.emit_event(ExecutionEvent::StepCompleted {
                        index,
                        step_name: step.name.clone(),
                    });
                }
                StepOutcome::Failure(failure) => {
                    state.fail(&failure);
                    self.emit_event(ExecutionEvent::StepFailed {
                        index,
                        step_name: failure.step_name.clone(),
                        error: failure.cause.to_string(),
                    });
                    self.finish(&state);
                    return Ok(RunOutcome::Failed(failure));
                }
            }
        }

        state.complete();
        self.finish(&state);
        Ok(RunOutcome::Succeeded)
    }

    fn finish(&self, state: &PipelineState) {
        let status = state.status();
        info!(
            "Pipeline execution finished: {} - {:?} ({}/{} steps)",
            state.execution_id, status, state.completed_steps, state.total_steps
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id: state.execution_id,
            status,
            completed_steps: state.completed_steps,
            total_steps: state.total_steps,
        });
    }
}
