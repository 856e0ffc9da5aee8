//! Pipeline configuration from YAML

use crate::core::pipeline::{Command, PipelineDefinition, StepDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a pipeline document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pipeline document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("duplicate step name: {0}")]
    DuplicateStepName(String),

    #[error("step #{0} has an empty name")]
    EmptyStepName(usize),
}

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name (optional)
    #[serde(default)]
    pub name: Option<String>,

    /// Commands run at the start of every step
    #[serde(default)]
    pub setup_commands: Vec<Vec<String>>,

    /// Pipeline steps
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Global environment available to all steps
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Step name
    pub name: String,

    /// Container image the step runs in
    pub base_image: String,

    /// Working directory inside the container
    pub workdir: String,

    /// Host directory to mount at `workdir`; empty means no mount
    #[serde(default)]
    pub source_directory: String,

    /// Logical secret name -> "<path>/<field>" locator
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,

    /// Commands to run after setup
    #[serde(default)]
    pub commands: Vec<Vec<String>>,

    /// Step-local environment
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;
        if config.name.is_none() {
            config.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
        }
        Ok(config)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(ConfigError::EmptyStepName(index + 1));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(ConfigError::DuplicateStepName(step.name.clone()));
            }
        }
        Ok(())
    }

    /// Convert config to the pipeline domain model
    pub fn to_definition(&self) -> PipelineDefinition {
        PipelineDefinition {
            name: self.name.clone().unwrap_or_else(|| "pipeline".to_string()),
            setup_commands: to_commands(&self.setup_commands),
            steps: self.steps.iter().map(StepConfig::to_definition).collect(),
            env: self.variables.clone(),
        }
    }
}

impl StepConfig {
    fn to_definition(&self) -> StepDefinition {
        StepDefinition {
            name: self.name.clone(),
            base_image: self.base_image.clone(),
            workdir: self.workdir.clone(),
            source_directory: Some(self.source_directory.clone()).filter(|dir| !dir.is_empty()),
            secrets: self.secrets.clone(),
            commands: to_commands(&self.commands),
            env: self.variables.clone(),
        }
    }
}

fn to_commands(raw: &[Vec<String>]) -> Vec<Command> {
    raw.iter().cloned().map(Command).collect()
}
