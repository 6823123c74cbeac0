//! Azure CLI token source
//!
//! Shells out to `az account get-access-token`. Requires a prior `az login`
//! on the machine running the operation.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::{AccessToken, TokenError, TokenSource};

#[cfg(windows)]
const AZ_PROGRAM: &str = "az.cmd";
#[cfg(not(windows))]
const AZ_PROGRAM: &str = "az";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
}

pub struct AzureCliTokenSource {
    program: String,
    tenant_id: Option<String>,
}

impl AzureCliTokenSource {
    pub fn new(tenant_id: Option<String>) -> Self {
        Self {
            program: AZ_PROGRAM.to_string(),
            tenant_id,
        }
    }

    /// Use a different executable in place of `az`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, audience: &str) -> Vec<String> {
        let mut args = vec![
            "account".to_string(),
            "get-access-token".to_string(),
            "--resource".to_string(),
            audience.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        if let Some(tenant) = &self.tenant_id {
            args.push("--tenant".to_string());
            args.push(tenant.clone());
        }
        args
    }

    fn parse_output(stdout: &[u8]) -> Result<AccessToken, TokenError> {
        let response: CliTokenResponse = serde_json::from_slice(stdout)?;
        AccessToken::new(response.access_token)
    }
}

#[async_trait]
impl TokenSource for AzureCliTokenSource {
    async fn acquire(&self, audience: &str) -> Result<AccessToken, TokenError> {
        debug!(program = %self.program, audience = %audience, "Requesting token from Azure CLI");

        let output = Command::new(&self.program)
            .args(self.args(audience))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TokenError::NoCredentials(format!(
                    "failed to run {}: {}. Install the Azure CLI or choose another provider",
                    self.program, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TokenError::NoCredentials(format!(
                "az account get-access-token failed: {}. Run 'az login' first",
                stderr.trim()
            )));
        }

        Self::parse_output(&output.stdout)
    }

    fn name(&self) -> &str {
        "azure-cli"
    }
}
