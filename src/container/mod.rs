//! Container backend contract
//!
//! A step is described to the backend as a [`ContainerContext`]: a base image
//! and working directory plus an ordered list of pending [`ContainerOp`]s.
//! Nothing runs until [`ContainerBackend::materialize`] is called, which
//! realizes the whole context and reports one [`CompletionStatus`].

pub mod docker;

pub use docker::{DockerBackend, DockerConfig};

use crate::core::Command;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error types for backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("container backend unavailable: {0}")]
    Unavailable(String),

    #[error("failed to launch container: {0}")]
    Spawn(String),

    #[error("cannot mount {path}: {reason}")]
    Mount { path: String, reason: String },

    #[error("container timed out after {0} seconds")]
    Timeout(u64),
}

/// One pending operation on a context
#[derive(Clone, PartialEq, Eq)]
pub enum ContainerOp {
    /// Mount a host directory tree at `target`
    Mount { host_path: String, target: String },
    /// Set an environment variable
    SetEnv { name: String, value: String },
    /// Run a command
    Exec(Command),
}

impl fmt::Debug for ContainerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerOp::Mount { host_path, target } => f
                .debug_struct("Mount")
                .field("host_path", host_path)
                .field("target", target)
                .finish(),
            ContainerOp::SetEnv { name, .. } => f
                .debug_struct("SetEnv")
                .field("name", name)
                .field("value", &"[REDACTED]")
                .finish(),
            ContainerOp::Exec(command) => f.debug_tuple("Exec").field(command).finish(),
        }
    }
}

/// An execution context under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerContext {
    image: String,
    workdir: String,
    ops: Vec<ContainerOp>,
}

impl ContainerContext {
    pub fn new(image: impl Into<String>, workdir: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            workdir: workdir.into(),
            ops: Vec::new(),
        }
    }

    pub fn with_directory(mut self, host_path: impl Into<String>, target: impl Into<String>) -> Self {
        self.ops.push(ContainerOp::Mount {
            host_path: host_path.into(),
            target: target.into(),
        });
        self
    }

    pub fn with_env_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(ContainerOp::SetEnv {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_exec(mut self, command: Command) -> Self {
        self.ops.push(ContainerOp::Exec(command));
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn workdir(&self) -> &str {
        &self.workdir
    }

    /// Pending operations in the order they were applied
    pub fn ops(&self) -> &[ContainerOp] {
        &self.ops
    }

    /// Commands queued so far, in order
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.ops.iter().filter_map(|op| match op {
            ContainerOp::Exec(command) => Some(command),
            _ => None,
        })
    }
}

/// How a materialized context finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Success,
    /// Non-zero exit; `None` when the process was killed by a signal
    Exited(Option<i32>),
}

impl CompletionStatus {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => CompletionStatus::Success,
            other => CompletionStatus::Exited(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompletionStatus::Success)
    }
}

/// Trait for container execution - allows for different implementations
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    /// Start a context from a base image and working directory
    fn container(&self, image: &str, workdir: &str) -> ContainerContext {
        ContainerContext::new(image, workdir)
    }

    /// Run everything queued on `context` and report the final status
    async fn materialize(&self, context: ContainerContext) -> Result<CompletionStatus, BackendError>;
}

#[async_trait]
impl<T: ContainerBackend + ?Sized> ContainerBackend for Arc<T> {
    fn container(&self, image: &str, workdir: &str) -> ContainerContext {
        (**self).container(image, workdir)
    }

    async fn materialize(&self, context: ContainerContext) -> Result<CompletionStatus, BackendError> {
        (**self).materialize(context).await
    }
}
