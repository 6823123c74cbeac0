//! Service principal (client credentials) token source

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sqlsso_config::TokenConfig;
use tracing::debug;

use crate::{non_empty, scope_for, AccessToken, TokenError, TokenSource};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

pub struct ServicePrincipalTokenSource {
    client: Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl ServicePrincipalTokenSource {
    pub fn new(
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        Self {
            client: Client::new(),
            authority_host: authority_host.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }

    /// Values from the config, falling back to the `AZURE_*` variables used by
    /// the Azure SDKs.
    pub fn from_config(config: &TokenConfig) -> Result<Self, TokenError> {
        let tenant_id = resolve(&config.tenant_id, "AZURE_TENANT_ID")
            .ok_or_else(|| missing("tenant id"))?;
        let client_id = resolve(&config.client_id, "AZURE_CLIENT_ID")
            .ok_or_else(|| missing("client id"))?;
        let client_secret = resolve(&config.client_secret, "AZURE_CLIENT_SECRET")
            .ok_or_else(|| missing("client secret"))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TokenError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            authority_host: config.authority_host.trim_end_matches('/').to_string(),
            tenant_id,
            client_id,
            client_secret,
        })
    }

    /// True when tenant, client id and secret are all available
    pub fn is_configured(config: &TokenConfig) -> bool {
        Self::is_configured_with(config, &|var| std::env::var(var).ok())
    }

    /// [`Self::is_configured`] with an explicit environment lookup
    pub(crate) fn is_configured_with(
        config: &TokenConfig,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> bool {
        let present = |configured: &str, var: &str| {
            non_empty(configured).is_some() || env(var).and_then(|v| non_empty(&v)).is_some()
        };
        present(&config.tenant_id, "AZURE_TENANT_ID")
            && present(&config.client_id, "AZURE_CLIENT_ID")
            && present(&config.client_secret, "AZURE_CLIENT_SECRET")
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_host, self.tenant_id)
    }
}

fn missing(what: &str) -> TokenError {
    TokenError::ConfigError(format!("service principal requires a {}", what))
}

fn resolve(configured: &str, env_var: &str) -> Option<String> {
    non_empty(configured).or_else(|| std::env::var(env_var).ok().and_then(|v| non_empty(&v)))
}

#[async_trait]
impl TokenSource for ServicePrincipalTokenSource {
    async fn acquire(&self, audience: &str) -> Result<AccessToken, TokenError> {
        let url = self.token_url();
        let scope = scope_for(audience);
        debug!(
            url = %url,
            scope = %scope,
            client_id = %self.client_id,
            "Requesting client credentials token"
        );

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| TokenError::RequestError(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => format!("{}: {}", err.error, err.error_description),
                Err(_) => body,
            };
            return Err(TokenError::NoCredentials(format!(
                "token endpoint returned {}: {}",
                status, message
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::InvalidResponse(format!("token endpoint response: {}", e)))?;

        AccessToken::new(body.access_token)
    }

    fn name(&self) -> &str {
        "service-principal"
    }
}
