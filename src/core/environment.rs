//! Environment layering for a single step

use crate::core::pipeline::EnvMap;
use crate::secrets::ResolvedSecrets;
use std::fmt;

/// The environment a step's container is started with
///
/// Built once per step and handed to the backend as-is. Values may include
/// resolved secrets, so `Debug` only shows variable names.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EffectiveEnvironment(EnvMap);

impl EffectiveEnvironment {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> EnvMap {
        self.0
    }
}

impl fmt::Debug for EffectiveEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Merge the three environment layers of a step
///
/// Precedence, lowest to highest: pipeline-global, resolved secrets,
/// step-local. A later layer replaces an earlier one on key collision.
pub fn compose(global: &EnvMap, secrets: &ResolvedSecrets, local: &EnvMap) -> EffectiveEnvironment {
    let mut env = global.clone();
    env.extend(secrets.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    env.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
    EffectiveEnvironment(env)
}
