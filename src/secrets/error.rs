//! Secret resolution errors

use thiserror::Error;

/// Errors from resolving a step's secrets
#[derive(Debug, Error)]
pub enum SecretError {
    /// The resolver has no credential to authenticate with; no request was made
    #[error("secret store credential is not set")]
    CredentialMissing,

    #[error("failed to fetch secret {name}: {cause}")]
    Fetch {
        /// Logical secret name as declared by the step
        name: String,
        #[source]
        cause: FetchCause,
    },
}

impl SecretError {
    pub fn fetch(name: impl Into<String>, cause: FetchCause) -> Self {
        SecretError::Fetch {
            name: name.into(),
            cause,
        }
    }
}

/// Why a single secret could not be fetched
#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("malformed locator '{0}': expected '<path>/<field>'")]
    MalformedLocator(String),

    #[error("request to secret store failed: {0}")]
    Transport(String),

    #[error("secret store responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unparsable secret store response: {0}")]
    Unparsable(String),

    #[error("field '{0}' not found in response")]
    FieldMissing(String),
}
