//! Resolves a step's secret requests into values

use crate::secrets::{FetchCause, Locator, ResolvedSecrets, SecretError, SecretStore};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Environment variable the store credential is exposed under when forwarded
pub const FORWARDED_TOKEN_VAR: &str = "VAULT_TOKEN";

/// Which key selects the value inside the store's response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKey {
    /// The field segment of the locator (`kv/app/token` -> `token`)
    #[default]
    Locator,
    /// The step's logical secret name
    SecretName,
}

/// Resolver behaviour
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Key used to pick the value out of a store response
    pub field_key: FieldKey,

    /// Also hand the store credential to every step as `VAULT_TOKEN`
    pub forward_token: bool,
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_key(mut self, field_key: FieldKey) -> Self {
        self.field_key = field_key;
        self
    }

    pub fn with_forward_token(mut self, forward_token: bool) -> Self {
        self.forward_token = forward_token;
        self
    }
}

/// Resolves secret locators against a store
pub struct SecretResolver<S> {
    store: S,
    config: ResolverConfig,
}

impl<S: SecretStore> SecretResolver<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ResolverConfig::default())
    }

    pub fn with_config(store: S, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Fail unless the store has a credential to authenticate with
    pub fn ensure_credential(&self) -> Result<&str, SecretError> {
        self.store.credential().ok_or(SecretError::CredentialMissing)
    }

    /// Resolve every `name -> locator` pair
    ///
    /// Issues one read per locator, in name order, with no caching. The first
    /// failure aborts the whole set; no partial result is returned.
    pub async fn resolve(
        &self,
        locators: &BTreeMap<String, String>,
    ) -> Result<ResolvedSecrets, SecretError> {
        let token = self.ensure_credential()?;

        let mut resolved = ResolvedSecrets::default();
        if self.config.forward_token {
            resolved.insert(FORWARDED_TOKEN_VAR, token);
        }

        for (name, raw) in locators {
            let value = self
                .resolve_one(name, raw)
                .await
                .map_err(|cause| SecretError::fetch(name, cause))?;
            resolved.insert(name.clone(), value);
        }

        Ok(resolved)
    }

    async fn resolve_one(&self, name: &str, raw: &str) -> Result<String, FetchCause> {
        let locator = Locator::parse(raw)?;
        debug!("Fetching secret {} from {}", name, locator.location);

        let mut data = self.store.read(locator.location).await.inspect_err(|e| {
            warn!("Secret store read for {} failed: {}", name, e);
        })?;

        let key = match self.config.field_key {
            FieldKey::Locator => locator.field,
            FieldKey::SecretName => name,
        };
        data.remove(key)
            .map(field_text)
            .ok_or_else(|| FetchCause::FieldMissing(key.to_string()))
    }
}

/// Strings are used as-is, anything else as its JSON text (`5432`, `true`)
fn field_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
