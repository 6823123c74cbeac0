//! sqlsso Identity Token Sources
//!
//! Acquires short-lived Azure AD bearer tokens for a resource audience:
//! - Azure CLI (`az account get-access-token`)
//! - Managed identity (App Service identity endpoint or IMDS)
//! - Service principal (OAuth2 client credentials)
//! - A pre-issued token in an environment variable
//!
//! Tokens are never cached. Every call to [`TokenSource::acquire`] goes back to
//! the broker, and every failure is returned to the caller without retrying.

use async_trait::async_trait;
use sqlsso_config::TokenConfig;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

mod azure_cli;
mod env;
mod managed_identity;
mod service_principal;

pub use azure_cli::AzureCliTokenSource;
pub use env::{EnvTokenSource, StaticTokenSource};
pub use managed_identity::ManagedIdentityTokenSource;
pub use service_principal::ServicePrincipalTokenSource;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("No credentials available: {0}")]
    NoCredentials(String),
    #[error("Token request failed: {0}")]
    RequestError(String),
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
    #[error("Invalid token source configuration: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A bearer token. The value is only reachable through [`AccessToken::secret`];
/// `Debug` output is redacted and there is deliberately no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token, rejecting empty values.
    pub fn new(value: impl Into<String>) -> Result<Self, TokenError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(TokenError::InvalidResponse("token is empty".to_string()));
        }
        Ok(Self(value))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Identity token source
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Acquire a fresh token scoped to `audience` (a resource URI such as
    /// `https://database.windows.net/`)
    async fn acquire(&self, audience: &str) -> Result<AccessToken, TokenError>;

    /// Source name, for logs and diagnostics
    fn name(&self) -> &str;
}

/// OAuth2 v2 scope for a v1-style resource audience.
pub(crate) fn scope_for(audience: &str) -> String {
    format!("{}/.default", audience.trim_end_matches('/'))
}

/// Create a token source based on configuration
pub fn create_token_source(config: &TokenConfig) -> Result<Arc<dyn TokenSource>, TokenError> {
    match config.provider.as_str() {
        "azure-cli" => {
            info!("Using Azure CLI token source");
            Ok(Arc::new(AzureCliTokenSource::new(non_empty(&config.tenant_id))))
        }
        "managed-identity" => {
            info!("Using managed identity token source");
            Ok(Arc::new(ManagedIdentityTokenSource::from_config(config)?))
        }
        "service-principal" => {
            info!("Using service principal token source");
            Ok(Arc::new(ServicePrincipalTokenSource::from_config(config)?))
        }
        "env" => {
            info!(var = %config.env_var, "Using environment variable token source");
            Ok(Arc::new(EnvTokenSource::new(&config.env_var)))
        }
        "auto" => select_automatic(config),
        other => Err(TokenError::ConfigError(format!("Unknown token provider: {}", other))),
    }
}

/// Provider picked by `auto`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AutoChoice {
    ServicePrincipal,
    ManagedIdentity,
    AzureCli,
}

/// Service principal when credentials are configured, managed identity when
/// the hosting environment advertises one, otherwise the Azure CLI.
fn automatic_choice(config: &TokenConfig, env: &dyn Fn(&str) -> Option<String>) -> AutoChoice {
    if ServicePrincipalTokenSource::is_configured_with(config, env) {
        AutoChoice::ServicePrincipal
    } else if !config.managed_identity_endpoint.is_empty() || env("IDENTITY_ENDPOINT").is_some() {
        AutoChoice::ManagedIdentity
    } else {
        AutoChoice::AzureCli
    }
}

fn select_automatic(config: &TokenConfig) -> Result<Arc<dyn TokenSource>, TokenError> {
    match automatic_choice(config, &|var| std::env::var(var).ok()) {
        AutoChoice::ServicePrincipal => {
            info!("Auto-selected service principal token source");
            Ok(Arc::new(ServicePrincipalTokenSource::from_config(config)?))
        }
        AutoChoice::ManagedIdentity => {
            info!("Auto-selected managed identity token source");
            Ok(Arc::new(ManagedIdentityTokenSource::from_config(config)?))
        }
        AutoChoice::AzureCli => {
            info!("Auto-selected Azure CLI token source");
            Ok(Arc::new(AzureCliTokenSource::new(non_empty(&config.tenant_id))))
        }
    }
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
