//! Managed identity token source
//!
//! Two endpoint flavours:
//! - App Service / Functions: `IDENTITY_ENDPOINT` + `IDENTITY_HEADER`
//! - Virtual machines and containers: the instance metadata service (IMDS)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sqlsso_config::TokenConfig;
use tracing::debug;

use crate::{non_empty, AccessToken, TokenError, TokenSource};

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

#[derive(Debug, Clone)]
enum Endpoint {
    AppService { url: String, header: String },
    Imds { url: String },
}

#[derive(Deserialize)]
struct ManagedIdentityResponse {
    access_token: String,
}

pub struct ManagedIdentityTokenSource {
    client: Client,
    endpoint: Endpoint,
    client_id: Option<String>,
}

impl ManagedIdentityTokenSource {
    pub fn from_config(config: &TokenConfig) -> Result<Self, TokenError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TokenError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = match (
            std::env::var("IDENTITY_ENDPOINT").ok(),
            std::env::var("IDENTITY_HEADER").ok(),
        ) {
            (Some(url), Some(header)) if config.managed_identity_endpoint.is_empty() => {
                Endpoint::AppService { url, header }
            }
            _ => Endpoint::Imds {
                url: non_empty(&config.managed_identity_endpoint)
                    .unwrap_or_else(|| IMDS_ENDPOINT.to_string()),
            },
        };

        Ok(Self {
            client,
            endpoint,
            client_id: non_empty(&config.client_id),
        })
    }

    /// IMDS-style source against an explicit endpoint
    pub fn with_imds_endpoint(url: &str, client_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: Endpoint::Imds { url: url.to_string() },
            client_id,
        }
    }

    /// App Service-style source against an explicit endpoint
    pub fn with_app_service_endpoint(url: &str, header: &str, client_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: Endpoint::AppService {
                url: url.to_string(),
                header: header.to_string(),
            },
            client_id,
        }
    }
}

#[async_trait]
impl TokenSource for ManagedIdentityTokenSource {
    async fn acquire(&self, audience: &str) -> Result<AccessToken, TokenError> {
        let mut query: Vec<(&str, &str)> = vec![("resource", audience)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let request = match &self.endpoint {
            Endpoint::AppService { url, header } => {
                debug!(url = %url, "Requesting token from App Service identity endpoint");
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.client.get(url).header("X-IDENTITY-HEADER", header)
            }
            Endpoint::Imds { url } => {
                debug!(url = %url, "Requesting token from IMDS");
                query.push(("api-version", IMDS_API_VERSION));
                self.client.get(url).header("Metadata", "true")
            }
        };

        let response = request
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                TokenError::RequestError(format!("managed identity endpoint unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::NoCredentials(format!(
                "managed identity endpoint returned {}: {}",
                status, body
            )));
        }

        let body: ManagedIdentityResponse = response
            .json()
            .await
            .map_err(|e| TokenError::InvalidResponse(format!("managed identity response: {}", e)))?;

        AccessToken::new(body.access_token)
    }

    fn name(&self) -> &str {
        "managed-identity"
    }
}
