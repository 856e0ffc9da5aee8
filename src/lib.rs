//! pipeline-runner - run declarative container pipelines with Vault-backed secrets

pub mod cli;
pub mod container;
pub mod core;
pub mod execution;
pub mod secrets;

// Re-export commonly used types
pub use container::{ContainerBackend, ContainerContext, CompletionStatus, DockerBackend, DockerConfig};
pub use core::{Command, PipelineDefinition, RunOutcome, StepDefinition, StepOutcome};
pub use execution::{ExecutionEvent, PipelineRunner, StepError, StepExecutor, StepFailure};
pub use secrets::{SecretResolver, SecretStore, VaultClient, VaultConfig};
