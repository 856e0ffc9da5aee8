//! Docker CLI backend - realizes a context with `docker run`

use crate::container::{BackendError, CompletionStatus, ContainerBackend, ContainerContext, ContainerOp};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

/// Configuration for the Docker backend
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Path to the docker executable
    pub docker_path: String,

    /// Wall-clock limit for one step's container, if any
    pub timeout_secs: Option<u64>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            docker_path: "docker".to_string(),
            timeout_secs: None,
        }
    }
}

impl DockerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docker_path(mut self, docker_path: impl Into<String>) -> Self {
        self.docker_path = docker_path.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Variables the docker client itself reads; forwarding them through the
/// client's environment would change how the client behaves
const CLIENT_ENV: &[&str] = &[
    "PATH",
    "HOME",
    "DOCKER_HOST",
    "DOCKER_CONFIG",
    "DOCKER_CONTEXT",
    "DOCKER_CERT_PATH",
    "DOCKER_TLS_VERIFY",
    "DOCKER_API_VERSION",
];

/// One `docker run` call: arguments plus the client environment
///
/// Environment values are never placed in `args`. Each variable is passed as
/// `--env NAME` and its value travels in `env`, which docker forwards from
/// the client process into the container. Names in `CLIENT_ENV` are the
/// exception and go on the command line as `NAME=value`.
#[derive(Clone, PartialEq, Eq)]
pub struct DockerInvocation {
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl fmt::Debug for DockerInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerInvocation")
            .field("args", &self.args)
            .field("env", &self.env.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

/// Backend that shells out to the docker CLI
#[derive(Debug, Clone)]
pub struct DockerBackend {
    config: DockerConfig,
}

impl DockerBackend {
    /// Check the daemon is reachable and return a backend bound to it
    pub async fn connect(config: DockerConfig) -> Result<Self, BackendError> {
        let output = Command::new(&config.docker_path)
            .args(["version", "--format", "{{.Server.Version}}"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                BackendError::Unavailable(format!("cannot execute {}: {}", config.docker_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Unavailable(stderr.trim().to_string()));
        }

        debug!(
            "Connected to docker server {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(Self { config })
    }

    /// Build the `docker run` call for a context, naming the container `name`
    ///
    /// A context with exactly one command runs it as the container's
    /// entrypoint, so images without a shell work. Anything else is joined
    /// into a `set -e` script for `sh -c`.
    pub fn run_invocation(context: &ContainerContext, name: &str) -> Result<DockerInvocation, BackendError> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--workdir".to_string(),
            context.workdir().to_string(),
        ];

        let mut env = BTreeMap::new();
        let mut commands = Vec::new();

        for op in context.ops() {
            match op {
                ContainerOp::Mount { host_path, target } => {
                    let source = absolute(host_path)?;
                    args.push("--mount".to_string());
                    args.push(format!(
                        "type=bind,{},{}",
                        mount_field("source", &source),
                        mount_field("target", target)
                    ));
                }
                ContainerOp::SetEnv { name, value } => {
                    env.insert(name.as_str(), value.as_str());
                }
                ContainerOp::Exec(command) => commands.push(command.tokens()),
            }
        }

        let mut client_env = Vec::new();
        for (name, value) in env {
            args.push("--env".to_string());
            if CLIENT_ENV.contains(&name) {
                args.push(format!("{}={}", name, value));
            } else {
                args.push(name.to_string());
                client_env.push((name.to_string(), value.to_string()));
            }
        }

        match commands.as_slice() {
            [[program, rest @ ..]] => {
                args.extend(["--entrypoint".to_string(), program.clone(), context.image().to_string()]);
                args.extend(rest.iter().cloned());
            }
            _ => {
                let mut script: Vec<String> = commands
                    .iter()
                    .map(|tokens| tokens.iter().map(|t| shell_quote(t)).collect::<Vec<_>>().join(" "))
                    .collect();
                if script.is_empty() {
                    script.push("true".to_string());
                }
                args.extend([
                    "--entrypoint".to_string(),
                    "sh".to_string(),
                    context.image().to_string(),
                    "-c".to_string(),
                    format!("set -e\n{}", script.join("\n")),
                ]);
            }
        }

        Ok(DockerInvocation {
            args,
            env: client_env,
        })
    }

    /// Force-remove a container; the run has already failed, so errors are only logged
    async fn remove(&self, name: &str) {
        let result = Command::new(&self.config.docker_path)
            .args(["rm", "-f", name])
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => debug!("Removed container {}", name),
            Ok(output) => warn!(
                "Failed to remove container {}: {}",
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Failed to remove container {}: {}", name, e),
        }
    }
}

#[async_trait]
impl ContainerBackend for DockerBackend {
    async fn materialize(&self, context: ContainerContext) -> Result<CompletionStatus, BackendError> {
        let name = format!("pipeline-{}", Uuid::new_v4());
        let invocation = Self::run_invocation(&context, &name)?;
        debug!(
            "docker run {} as {} in {} ({} operations)",
            context.image(),
            name,
            context.workdir(),
            context.ops().len()
        );

        let mut command = Command::new(&self.config.docker_path);
        command
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .kill_on_drop(true);

        let status = match self.config.timeout_secs {
            Some(secs) => {
                let result = timeout(Duration::from_secs(secs), command.status()).await;
                match result {
                    Ok(status) => status,
                    Err(_) => {
                        // Killing the client leaves the container running
                        warn!("Container {} timed out after {}s, removing it", name, secs);
                        self.remove(&name).await;
                        return Err(BackendError::Timeout(secs));
                    }
                }
            }
            None => command.status().await,
        }
        .map_err(|e| BackendError::Spawn(e.to_string()))?;

        let completion = CompletionStatus::from_code(status.code());
        if !completion.is_success() {
            warn!("Container for {} exited with {:?}", context.image(), status.code());
        }
        Ok(completion)
    }
}

fn absolute(path: &str) -> Result<String, BackendError> {
    let path = Path::new(path);
    if path.is_absolute() {
        return Ok(path.display().to_string());
    }
    let cwd = std::env::current_dir().map_err(|e| BackendError::Mount {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(cwd.join(path).display().to_string())
}

/// One `key=value` field of a `--mount` spec, CSV-quoted when needed
fn mount_field(key: &str, value: &str) -> String {
    let field = format!("{}={}", key, value);
    if field.contains([',', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

/// Quote a token for `sh -c`
fn shell_quote(token: &str) -> String {
    let plain = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}
