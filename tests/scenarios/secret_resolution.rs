//! Test: Secret Resolution - store reads, field selection, and failures

use crate::helpers::*;
use pipeline_runner::container::ContainerOp;
use pipeline_runner::core::{Command, PipelineDefinition, RunOutcome, StepDefinition};
use pipeline_runner::execution::StepError;
use pipeline_runner::secrets::{FetchCause, FieldKey, ResolverConfig, SecretError};

fn env_of(result: &PipelineTestResult, call: usize) -> Vec<(String, String)> {
    result.backend.contexts()[call]
        .ops()
        .iter()
        .filter_map(|op| match op {
            ContainerOp::SetEnv { name, value } => Some((name.clone(), value.clone())),
            _ => None,
        })
        .collect()
}

fn secret_step(name: &str, secret: &str, locator: &str) -> StepDefinition {
    StepDefinition::new(name, "alpine:3", "/w")
        .with_secret(secret, locator)
        .with_command(Command::new(["deploy"]))
}

#[tokio::test]
async fn test_secret_reaches_step_environment() {
    let pipeline = PipelineDefinition::new("deploy").with_step(secret_step("deploy", "API_KEY", "secret/data/app/key"));
    let store = StaticSecretStore::new(Some("t")).with("secret/data/app", &[("key", "abc123")]);

    let result = run_pipeline_with(&pipeline, store, RecordingBackend::new(), ResolverConfig::default()).await;

    assert!(result.is_success());
    assert_eq!(result.store.reads(), 1);
    assert_eq!(env_of(&result, 0), vec![("API_KEY".to_string(), "abc123".to_string())]);
}

#[tokio::test]
async fn test_field_key_can_select_by_secret_name() {
    let pipeline = PipelineDefinition::new("deploy").with_step(secret_step("deploy", "API_KEY", "secret/data/app/key"));
    let store = StaticSecretStore::new(Some("t"))
        .with("secret/data/app", &[("key", "by-field"), ("API_KEY", "by-name")]);
    let config = ResolverConfig::new().with_field_key(FieldKey::SecretName);

    let result = run_pipeline_with(&pipeline, store, RecordingBackend::new(), config).await;

    assert!(result.is_success());
    assert_eq!(env_of(&result, 0), vec![("API_KEY".to_string(), "by-name".to_string())]);
}

#[tokio::test]
async fn test_store_failure_is_attributed_to_step_and_secret() {
    let pipeline = PipelineDefinition::new("deploy")
        .with_step(StepDefinition::new("prepare", "alpine:3", "/w").with_command(Command::new(["true"])))
        .with_step(secret_step("deploy", "API_KEY", "secret/data/missing/key"))
        .with_step(StepDefinition::new("notify", "alpine:3", "/w").with_command(Command::new(["true"])));

    let result = run_pipeline_with(
        &pipeline,
        StaticSecretStore::new(Some("t")),
        RecordingBackend::new(),
        ResolverConfig::default(),
    )
    .await;

    assert_failed_at(&result, "deploy", 1);
    assert_eq!(result.backend.calls(), 1);
    match &result.outcome {
        Ok(RunOutcome::Failed(failure)) => match &failure.cause {
            StepError::Secrets(SecretError::Fetch { name, cause }) => {
                assert_eq!(name, "API_KEY");
                assert!(matches!(cause, FetchCause::Status { status: 404, .. }));
            }
            other => panic!("Expected fetch error, got {:?}", other),
        },
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_field_fails_the_step() {
    let pipeline = PipelineDefinition::new("deploy").with_step(secret_step("deploy", "API_KEY", "secret/data/app/other"));
    let store = StaticSecretStore::new(Some("t")).with("secret/data/app", &[("key", "abc123")]);

    let result = run_pipeline_with(&pipeline, store, RecordingBackend::new(), ResolverConfig::default()).await;

    assert_failed_at(&result, "deploy", 0);
    assert_eq!(result.backend.calls(), 0);
    match &result.outcome {
        Ok(RunOutcome::Failed(failure)) => assert!(matches!(
            &failure.cause,
            StepError::Secrets(SecretError::Fetch {
                cause: FetchCause::FieldMissing(field),
                ..
            }) if field == "other"
        )),
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_locator_fails_without_store_read() {
    let pipeline = PipelineDefinition::new("deploy").with_step(secret_step("deploy", "API_KEY", "no-separator"));

    let result = run_pipeline_with(
        &pipeline,
        StaticSecretStore::new(Some("t")),
        RecordingBackend::new(),
        ResolverConfig::default(),
    )
    .await;

    assert_failed_at(&result, "deploy", 0);
    assert_eq!(result.store.reads(), 0);
    match &result.outcome {
        Ok(RunOutcome::Failed(failure)) => assert!(matches!(
            &failure.cause,
            StepError::Secrets(SecretError::Fetch {
                cause: FetchCause::MalformedLocator(_),
                ..
            })
        )),
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_token_forwarding_is_opt_in() {
    let pipeline = PipelineDefinition::new("deploy")
        .with_step(StepDefinition::new("deploy", "alpine:3", "/w").with_command(Command::new(["true"])));

    let plain = run_pipeline_with(
        &pipeline,
        StaticSecretStore::new(Some("root-token")),
        RecordingBackend::new(),
        ResolverConfig::default(),
    )
    .await;
    assert!(env_of(&plain, 0).is_empty());

    let forwarded = run_pipeline_with(
        &pipeline,
        StaticSecretStore::new(Some("root-token")),
        RecordingBackend::new(),
        ResolverConfig::new().with_forward_token(true),
    )
    .await;
    assert_eq!(
        env_of(&forwarded, 0),
        vec![("VAULT_TOKEN".to_string(), "root-token".to_string())]
    );
}
