//! sqlsso Configuration System
//!
//! TOML-based configuration with environment variable overrides. Every field
//! has a default, so an empty or missing file yields a usable configuration
//! that authenticates through the Azure CLI.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Token provider names accepted in `[token].provider`.
pub const TOKEN_PROVIDERS: &[&str] = &[
    "auto",
    "azure-cli",
    "managed-identity",
    "service-principal",
    "env",
];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub token: TokenConfig,
    pub sqlserver: SqlServerConfig,
    pub postgres: PostgresConfig,
    pub operation: OperationConfig,
}

/// Identity token acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// One of [`TOKEN_PROVIDERS`]
    pub provider: String,
    /// Directory tenant; passed to `az` and required for service principals
    pub tenant_id: String,
    /// Service principal application id, or user-assigned managed identity client id
    pub client_id: String,
    /// Service principal secret (prefer `SQLSSO_CLIENT_SECRET`)
    pub client_secret: String,
    pub authority_host: String,
    /// Overrides the IMDS endpoint for managed identity
    pub managed_identity_endpoint: String,
    /// Environment variable read by the `env` provider
    pub env_var: String,
    pub request_timeout_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            provider: "auto".to_string(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            authority_host: "https://login.microsoftonline.com".to_string(),
            managed_identity_endpoint: String::new(),
            env_var: "SQLSSO_ACCESS_TOKEN".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl TokenConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// SQL Server family settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlServerConfig {
    /// Resource the access token is requested for
    pub audience: String,
    /// Skip TLS certificate validation (local containers only)
    pub trust_server_certificate: bool,
}

impl Default for SqlServerConfig {
    fn default() -> Self {
        Self {
            audience: "https://database.windows.net/".to_string(),
            trust_server_certificate: false,
        }
    }
}

/// Postgres family settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub audience: String,
    /// Database where AAD principals are registered and dropped
    pub admin_database: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            audience: "https://ossrdbms-aad.database.windows.net".to_string(),
            admin_database: "postgres".to_string(),
        }
    }
}

/// Per-operation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationConfig {
    /// Deadline for one create/delete call; 0 disables it
    pub timeout_secs: u64,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl OperationConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !TOKEN_PROVIDERS.contains(&self.token.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown token provider {:?} (expected one of {:?})",
                self.token.provider, TOKEN_PROVIDERS
            )));
        }
        if self.token.provider == "service-principal"
            && (self.token.tenant_id.is_empty() || self.token.client_id.is_empty())
        {
            return Err(ConfigError::ValidationError(
                "service-principal provider requires tenant_id and client_id".to_string(),
            ));
        }
        if self.token.provider == "env" && self.token.env_var.is_empty() {
            return Err(ConfigError::ValidationError(
                "env provider requires token.env_var".to_string(),
            ));
        }
        if self.sqlserver.audience.trim().is_empty() {
            return Err(ConfigError::ValidationError("sqlserver.audience is empty".to_string()));
        }
        if self.postgres.audience.trim().is_empty() {
            return Err(ConfigError::ValidationError("postgres.audience is empty".to_string()));
        }
        if self.postgres.admin_database.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "postgres.admin_database is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# sqlsso Configuration
# Environment variables (SQLSSO_*) override these settings

[token]
provider = "auto"  # auto, azure-cli, managed-identity, service-principal, env
tenant_id = ""
client_id = ""
# client_secret is better supplied through SQLSSO_CLIENT_SECRET
authority_host = "https://login.microsoftonline.com"
managed_identity_endpoint = ""
env_var = "SQLSSO_ACCESS_TOKEN"
request_timeout_secs = 30

[sqlserver]
audience = "https://database.windows.net/"
trust_server_certificate = false

[postgres]
audience = "https://ossrdbms-aad.database.windows.net"
admin_database = "postgres"

[operation]
timeout_secs = 300  # 0 disables the deadline
"#
        .to_string()
    }
}
