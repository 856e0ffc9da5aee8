//! Secret resolution against an external key/value store
//!
//! A step declares its secrets as a mapping of logical name to store
//! locator (`"<path>/<field>"`). The [`SecretResolver`] splits each locator,
//! reads the location from a [`SecretStore`], and extracts the field. The
//! resulting [`ResolvedSecrets`] live only as long as it takes to compose the
//! step's environment.

pub mod error;
pub mod locator;
pub mod resolver;
pub mod vault;

pub use error::{FetchCause, SecretError};
pub use locator::Locator;
pub use resolver::{FieldKey, ResolverConfig, SecretResolver, FORWARDED_TOKEN_VAR};
pub use vault::{VaultClient, VaultConfig};

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Field -> value mapping stored at one location
///
/// Values keep their JSON type; only the field a step asks for is turned
/// into a string.
pub type SecretData = HashMap<String, serde_json::Value>;

/// Trait for secret store access - allows for different implementations
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Bearer credential reads are authenticated with, if configured
    fn credential(&self) -> Option<&str>;

    /// Read every field stored at `location`
    async fn read(&self, location: &str) -> Result<SecretData, FetchCause>;
}

#[async_trait]
impl<T: SecretStore + ?Sized> SecretStore for Arc<T> {
    fn credential(&self) -> Option<&str> {
        (**self).credential()
    }

    async fn read(&self, location: &str) -> Result<SecretData, FetchCause> {
        (**self).read(location).await
    }
}

/// Logical secret name -> secret value, for one step
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedSecrets(BTreeMap<String, String>);

impl ResolvedSecrets {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ResolvedSecrets {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}
