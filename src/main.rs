use anyhow::{Context, Result};
use std::process::ExitCode;
use pipeline_runner::cli::commands::{RunCommand, ValidateCommand};
use pipeline_runner::cli::output::*;
use pipeline_runner::cli::{Cli, Command};
use pipeline_runner::container::{DockerBackend, DockerConfig};
use pipeline_runner::core::config::PipelineConfig;
use pipeline_runner::core::RunOutcome;
use pipeline_runner::execution::PipelineRunner;
use pipeline_runner::secrets::{ResolverConfig, SecretResolver, VaultClient, VaultConfig};
use tracing_subscriber::EnvFilter;

/// Environment variable the Vault token is read from
const VAULT_TOKEN_ENV: &str = "VAULT_TOKEN";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::from_args();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await,
        Command::Validate(cmd) => validate_pipeline(cmd),
    }
}

async fn run_pipeline(cmd: &RunCommand) -> Result<ExitCode> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    let mut pipeline = config.to_definition();

    println!("{} Loaded pipeline: {}", INFO, style(&pipeline.name).bold());

    // Apply variable overrides
    for (key, value) in &cmd.variable {
        pipeline.env.insert(key.clone(), value.clone());
        println!("{} Variable override: {}", INFO, style(key).cyan());
    }

    let vault_config = VaultConfig::new()
        .with_address(cmd.vault_addr.as_str())
        .with_token(std::env::var(VAULT_TOKEN_ENV).ok());
    let vault = VaultClient::new(vault_config).context("Failed to create Vault client")?;
    let resolver = SecretResolver::with_config(
        vault,
        ResolverConfig::new()
            .with_field_key(cmd.field_key.into())
            .with_forward_token(cmd.forward_vault_token),
    );

    // Report a missing token before touching docker
    if let Err(e) = resolver.ensure_credential() {
        eprintln!("{} {}: set {}", CROSS, style(&e).red(), VAULT_TOKEN_ENV);
        return Ok(ExitCode::FAILURE);
    }

    let docker_config = DockerConfig::new()
        .with_docker_path(cmd.docker.as_str())
        .with_timeout(cmd.timeout);
    let backend = DockerBackend::connect(docker_config)
        .await
        .context("Failed to connect to docker")?;

    let mut runner = PipelineRunner::new(resolver, backend);
    runner.add_event_handler(|event| {
        if let Some(line) = format_execution_event(event) {
            println!("{}", line);
        }
    });

    // Runner, Vault client and backend are released when this function returns
    println!();
    let code = match runner.run(&pipeline).await {
        Ok(RunOutcome::Succeeded) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&pipeline.name).bold(),
                style("successfully").green()
            );
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Failed(failure)) => {
            eprintln!(
                "\n{} step {} failed: {}",
                CROSS,
                style(&failure.step_name).red().bold(),
                failure.cause
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{} {}: set {}", CROSS, style(&e).red(), VAULT_TOKEN_ENV);
            ExitCode::FAILURE
        }
    };
    Ok(code)
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<ExitCode> {
    println!("{} Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            let pipeline = config.to_definition();
            let secrets: usize = pipeline.steps.iter().map(|s| s.secrets.len()).sum();

            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&pipeline.name).bold());
            println!("  Steps: {}", style(pipeline.steps.len()).cyan());
            println!("  Setup commands: {}", style(pipeline.setup_commands.len()).cyan());
            println!("  Variables: {}", style(pipeline.env.len()).cyan());
            println!("  Secrets: {}", style(secrets).cyan());
            if pipeline.requests_secrets() && std::env::var(VAULT_TOKEN_ENV).is_err() {
                println!("{} Steps request secrets but {} is not set", INFO, VAULT_TOKEN_ENV);
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            Ok(ExitCode::FAILURE)
        }
    }
}
