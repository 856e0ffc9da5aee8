//! Pipeline domain model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Environment mapping of variable name to literal value
pub type EnvMap = BTreeMap<String, String>;

/// A single command: program followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(pub Vec<String>);

impl Command {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// One containerized step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    /// Step name, used for logging and failure attribution
    pub name: String,

    /// Base image reference
    pub base_image: String,

    /// Working directory inside the container
    pub workdir: String,

    /// Host directory mounted at `workdir` (None = no mount)
    pub source_directory: Option<String>,

    /// Logical secret name -> store locator
    pub secrets: BTreeMap<String, String>,

    /// Commands run after the pipeline's setup commands
    pub commands: Vec<Command>,

    /// Step-local environment
    pub env: EnvMap,
}

impl StepDefinition {
    /// Create a step with no mount, secrets, commands, or environment
    pub fn new(
        name: impl Into<String>,
        base_image: impl Into<String>,
        workdir: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_image: base_image.into(),
            workdir: workdir.into(),
            source_directory: None,
            secrets: BTreeMap::new(),
            commands: Vec::new(),
            env: EnvMap::new(),
        }
    }

    pub fn with_source_directory(mut self, dir: impl Into<String>) -> Self {
        self.source_directory = Some(dir.into());
        self
    }

    pub fn with_secret(mut self, name: impl Into<String>, locator: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), locator.into());
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }
}

/// A loaded pipeline, immutable for the duration of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineDefinition {
    /// Display name
    pub name: String,

    /// Commands run at the start of every step
    pub setup_commands: Vec<Command>,

    /// Steps in declared order
    pub steps: Vec<StepDefinition>,

    /// Pipeline-global environment
    pub env: EnvMap,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_setup_command(mut self, command: Command) -> Self {
        self.setup_commands.push(command);
        self
    }

    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Whether any step asks for secrets
    pub fn requests_secrets(&self) -> bool {
        self.steps.iter().any(|s| !s.secrets.is_empty())
    }
}
