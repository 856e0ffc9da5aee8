//! CLI command definitions

use crate::secrets::FieldKey;
use clap::Args;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long, default_value = "pipeline.yaml")]
    pub file: String,

    /// Global environment overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub variable: Vec<(String, String)>,

    /// Vault server address
    #[arg(long, env = "VAULT_ADDR", default_value = "http://127.0.0.1:8200")]
    pub vault_addr: String,

    /// Which key selects a secret's value in the Vault response
    #[arg(long, value_enum, default_value_t = FieldKeyArg::Locator)]
    pub field_key: FieldKeyArg,

    /// Expose the Vault token to every step as VAULT_TOKEN
    #[arg(long)]
    pub forward_vault_token: bool,

    /// Path to the docker executable
    #[arg(long, default_value = "docker")]
    pub docker: String,

    /// Per-step container timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long, default_value = "pipeline.yaml")]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Field key argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FieldKeyArg {
    /// Last segment of the locator
    Locator,
    /// Logical secret name
    Name,
}

impl From<FieldKeyArg> for FieldKey {
    fn from(arg: FieldKeyArg) -> Self {
        match arg {
            FieldKeyArg::Locator => FieldKey::Locator,
            FieldKeyArg::Name => FieldKey::SecretName,
        }
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
