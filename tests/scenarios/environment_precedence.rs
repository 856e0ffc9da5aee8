//! Test: Environment Precedence - global < secrets < step-local

use crate::helpers::*;
use pipeline_runner::container::ContainerOp;
use pipeline_runner::secrets::ResolverConfig;

#[tokio::test]
async fn test_layers_override_in_order() {
    let yaml = r#"
name: "Precedence"

variables:
  MODE: "debug"
  REGION: "eu"
  API_KEY: "from-global"

steps:
  - name: "deploy"
    base_image: "alpine:3"
    workdir: "/w"
    secrets:
      API_KEY: "secret/data/app/key"
      MODE: "secret/data/app/mode"
    variables:
      MODE: "release"
    commands:
      - ["./deploy.sh"]

  - name: "verify"
    base_image: "alpine:3"
    workdir: "/w"
    commands:
      - ["./verify.sh"]
"#;
    let pipeline = pipeline_from_yaml(yaml);
    let store = StaticSecretStore::new(Some("t"))
        .with("secret/data/app", &[("key", "from-store"), ("mode", "from-store")]);

    let result = run_pipeline_with(&pipeline, store, RecordingBackend::new(), ResolverConfig::default()).await;
    assert!(result.is_success());

    let env = |call: usize| -> Vec<(String, String)> {
        result.backend.contexts()[call]
            .ops()
            .iter()
            .filter_map(|op| match op {
                ContainerOp::SetEnv { name, value } => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect()
    };

    // Applied in name order, one entry per variable
    assert_eq!(
        env(0),
        vec![
            ("API_KEY".to_string(), "from-store".to_string()),
            ("MODE".to_string(), "release".to_string()),
            ("REGION".to_string(), "eu".to_string()),
        ]
    );

    // Secrets and locals do not leak into later steps
    assert_eq!(
        env(1),
        vec![
            ("API_KEY".to_string(), "from-global".to_string()),
            ("MODE".to_string(), "debug".to_string()),
            ("REGION".to_string(), "eu".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_environment_is_set_before_commands() {
    let yaml = r#"
variables:
  CI: "true"
steps:
  - name: "build"
    base_image: "alpine:3"
    workdir: "/src"
    source_directory: "."
    commands:
      - ["make"]
"#;
    let result = run_pipeline_with_defaults(&pipeline_from_yaml(yaml)).await;
    let ops = result.backend.contexts()[0].ops().to_vec();

    assert!(matches!(ops[0], ContainerOp::Mount { .. }));
    assert!(matches!(ops[1], ContainerOp::SetEnv { ref name, .. } if name == "CI"));
    assert!(matches!(ops[2], ContainerOp::Exec(_)));
}
