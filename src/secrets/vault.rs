//! HashiCorp Vault KV client

use crate::secrets::{FetchCause, SecretData, SecretStore};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Configuration for the Vault client
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Server address, e.g. `https://vault.example.com:8200`
    pub address: String,

    /// Token sent as `X-Vault-Token`
    pub token: Option<String>,

    /// Timeout for each read in seconds
    pub timeout_secs: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl VaultConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// KV v2 read response: `{"data": {"data": {...}}}`
#[derive(Debug, Deserialize)]
struct KvResponse {
    data: KvData,
}

#[derive(Debug, Deserialize)]
struct KvData {
    data: SecretData,
}

/// Reads secrets over Vault's HTTP API
#[derive(Debug, Clone)]
pub struct VaultClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl VaultClient {
    /// Build a client; one per run
    pub fn new(config: VaultConfig) -> Result<Self, FetchCause> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchCause::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.address.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn url(&self, location: &str) -> String {
        format!("{}/v1/{}", self.base_url, location.trim_start_matches('/'))
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    fn credential(&self) -> Option<&str> {
        self.token.as_deref()
    }

    async fn read(&self, location: &str) -> Result<SecretData, FetchCause> {
        let url = self.url(location);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.header("X-Vault-Token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchCause::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchCause::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchCause::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: KvResponse =
            serde_json::from_str(&body).map_err(|e| FetchCause::Unparsable(e.to_string()))?;
        Ok(parsed.data.data)
    }
}
