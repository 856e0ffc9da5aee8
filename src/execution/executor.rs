//! Step executor - runs individual steps in a container

use crate::{
    container::{CompletionStatus, ContainerBackend, ContainerContext},
    core::{environment, Command, EffectiveEnvironment, EnvMap, StepDefinition, StepOutcome},
    execution::{StepError, StepFailure},
    secrets::{SecretResolver, SecretStore},
};
use tracing::{debug, error, info};

/// Executes a single step
pub struct StepExecutor<S, B> {
    resolver: SecretResolver<S>,
    backend: B,
}

impl<S: SecretStore, B: ContainerBackend> StepExecutor<S, B> {
    pub fn new(resolver: SecretResolver<S>, backend: B) -> Self {
        Self { resolver, backend }
    }

    pub fn resolver(&self) -> &SecretResolver<S> {
        &self.resolver
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Execute a step and return its outcome
    ///
    /// `step_index` is only used to attribute a failure.
    pub async fn execute(
        &self,
        step_index: usize,
        step: &StepDefinition,
        setup_commands: &[Command],
        global_env: &EnvMap,
    ) -> StepOutcome {
        match self.run(step, setup_commands, global_env).await {
            Ok(()) => {
                info!("Step {} completed successfully", step.name);
                StepOutcome::Success
            }
            Err(cause) => {
                error!("Step {} failed: {}", step.name, cause);
                StepOutcome::Failure(StepFailure::new(&step.name, step_index, cause))
            }
        }
    }

    async fn run(
        &self,
        step: &StepDefinition,
        setup_commands: &[Command],
        global_env: &EnvMap,
    ) -> Result<(), StepError> {
        info!("Executing step: {}", step.name);

        let secrets = self.resolver.resolve(&step.secrets).await?;
        let env = environment::compose(global_env, &secrets, &step.env);
        drop(secrets);
        debug!("Effective environment for step {}: {:?}", step.name, env);

        let context = self.build_context(step, setup_commands, env);
        debug!(
            "Materializing {} operations on {}",
            context.ops().len(),
            context.image()
        );

        match self.backend.materialize(context).await? {
            CompletionStatus::Success => Ok(()),
            CompletionStatus::Exited(code) => Err(StepError::NonZeroExit(code)),
        }
    }

    /// Queue a step's mount, environment, and commands on a fresh context
    pub fn build_context(
        &self,
        step: &StepDefinition,
        setup_commands: &[Command],
        env: EffectiveEnvironment,
    ) -> ContainerContext {
        let mut context = self.backend.container(&step.base_image, &step.workdir);

        if let Some(source) = &step.source_directory {
            context = context.with_directory(source.as_str(), step.workdir.as_str());
        }

        for (name, value) in env.into_inner() {
            context = context.with_env_variable(name, value);
        }

        for command in setup_commands.iter().chain(&step.commands) {
            context = context.with_exec(command.clone());
        }

        context
    }
}
