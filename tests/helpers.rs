//! Test utility functions for pipeline-runner

#![allow(dead_code)]

use async_trait::async_trait;
use pipeline_runner::container::{BackendError, CompletionStatus, ContainerBackend, ContainerContext};
use pipeline_runner::core::config::PipelineConfig;
use pipeline_runner::core::{PipelineDefinition, RunOutcome};
use pipeline_runner::execution::{ExecutionEvent, PipelineRunner};
use pipeline_runner::secrets::{FetchCause, ResolverConfig, SecretData, SecretError, SecretResolver, SecretStore};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Secret store backed by a fixed table of locations
pub struct StaticSecretStore {
    token: Option<String>,
    locations: HashMap<String, SecretData>,
    reads: AtomicUsize,
}

impl StaticSecretStore {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token.map(str::to_string),
            locations: HashMap::new(),
            reads: AtomicUsize::new(0),
        }
    }

    /// Store `fields` at `location`
    pub fn with(mut self, location: &str, fields: &[(&str, &str)]) -> Self {
        let data = fields
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
            .collect();
        self.locations.insert(location.to_string(), data);
        self
    }

    /// Number of reads issued so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    fn credential(&self) -> Option<&str> {
        self.token.as_deref()
    }

    async fn read(&self, location: &str) -> Result<SecretData, FetchCause> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.locations
            .get(location)
            .cloned()
            .ok_or_else(|| FetchCause::Status {
                status: 404,
                body: r#"{"errors":[]}"#.to_string(),
            })
    }
}

/// Backend that records every context it is asked to materialize
pub struct RecordingBackend {
    contexts: Mutex<Vec<ContainerContext>>,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            contexts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_on_call: None,
        }
    }

    /// Report exit status 1 on the `call`-th materialization (1-based)
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<ContainerContext> {
        self.contexts.lock().unwrap().clone()
    }

    /// Every command that reached the backend, rendered with spaces
    pub fn commands(&self) -> Vec<String> {
        self.contexts
            .lock()
            .unwrap()
            .iter()
            .flat_map(|c| c.commands().map(|cmd| cmd.to_string()).collect::<Vec<_>>())
            .collect()
    }

    /// Images of the materialized contexts, in order
    pub fn images(&self) -> Vec<String> {
        self.contexts
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.image().to_string())
            .collect()
    }
}

#[async_trait]
impl ContainerBackend for RecordingBackend {
    async fn materialize(&self, context: ContainerContext) -> Result<CompletionStatus, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.contexts.lock().unwrap().push(context);
        if Some(call) == self.fail_on_call {
            Ok(CompletionStatus::Exited(Some(1)))
        } else {
            Ok(CompletionStatus::Success)
        }
    }
}

/// Result of a pipeline run with stub collaborators
pub struct PipelineTestResult {
    pub outcome: Result<RunOutcome, SecretError>,
    pub store: Arc<StaticSecretStore>,
    pub backend: Arc<RecordingBackend>,
    pub events: Vec<ExecutionEvent>,
}

impl PipelineTestResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Ok(RunOutcome::Succeeded))
    }

    /// Names of the steps that started, in order
    pub fn started_steps(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::StepStarted { step_name, .. } => Some(step_name.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Run a pipeline against the given store and backend
pub async fn run_pipeline_with(
    pipeline: &PipelineDefinition,
    store: StaticSecretStore,
    backend: RecordingBackend,
    config: ResolverConfig,
) -> PipelineTestResult {
    let store = Arc::new(store);
    let backend = Arc::new(backend);
    let events = Arc::new(Mutex::new(Vec::new()));

    let mut runner = PipelineRunner::new(
        SecretResolver::with_config(store.clone(), config),
        backend.clone(),
    );
    let sink = events.clone();
    runner.add_event_handler(move |event| sink.lock().unwrap().push(event.clone()));

    let outcome = runner.run(pipeline).await;
    let events = events.lock().unwrap().clone();

    PipelineTestResult {
        outcome,
        store,
        backend,
        events,
    }
}

/// Run a pipeline with a credentialed empty store and a backend that always succeeds
pub async fn run_pipeline_with_defaults(pipeline: &PipelineDefinition) -> PipelineTestResult {
    run_pipeline_with(
        pipeline,
        StaticSecretStore::new(Some("test-token")),
        RecordingBackend::new(),
        ResolverConfig::default(),
    )
    .await
}

/// Assert the run failed at `step_name` (index `step_index`)
pub fn assert_failed_at(result: &PipelineTestResult, step_name: &str, step_index: usize) {
    match &result.outcome {
        Ok(RunOutcome::Failed(failure)) => {
            assert_eq!(failure.step_name, step_name, "failure attributed to wrong step");
            assert_eq!(failure.step_index, step_index, "failure attributed to wrong index");
        }
        other => panic!("Expected step {} to fail, got {:?}", step_name, other),
    }
}

/// Parse a pipeline from YAML, panicking on error
pub fn pipeline_from_yaml(yaml: &str) -> PipelineDefinition {
    PipelineConfig::from_yaml(yaml)
        .expect("Failed to parse pipeline YAML")
        .to_definition()
}
