//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "sqlsso.toml",
    "config.toml",
    "./config/sqlsso.toml",
    "/etc/sqlsso/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides.
    ///
    /// An explicit path that does not exist is an error; the search paths are
    /// optional.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(ConfigError::ValidationError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
        }

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("SQLSSO_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // Token
        if let Ok(val) = env::var("SQLSSO_TOKEN_PROVIDER") {
            config.token.provider = val;
        }
        if let Ok(val) = env::var("SQLSSO_TENANT_ID") {
            config.token.tenant_id = val;
        }
        if let Ok(val) = env::var("SQLSSO_CLIENT_ID") {
            config.token.client_id = val;
        }
        if let Ok(val) = env::var("SQLSSO_CLIENT_SECRET") {
            config.token.client_secret = val;
        }
        if let Ok(val) = env::var("SQLSSO_AUTHORITY_HOST") {
            config.token.authority_host = val;
        }
        if let Some(secs) = numeric_override("SQLSSO_TOKEN_TIMEOUT_SECS") {
            config.token.request_timeout_secs = secs;
        }

        // SQL Server
        if let Ok(val) = env::var("SQLSSO_MSSQL_AUDIENCE") {
            config.sqlserver.audience = val;
        }
        if let Ok(val) = env::var("SQLSSO_MSSQL_TRUST_SERVER_CERTIFICATE") {
            match parse_bool(&val) {
                Some(trust) => config.sqlserver.trust_server_certificate = trust,
                None => warn!(
                    var = "SQLSSO_MSSQL_TRUST_SERVER_CERTIFICATE",
                    value = %val,
                    "Ignoring invalid boolean override"
                ),
            }
        }

        // Postgres
        if let Ok(val) = env::var("SQLSSO_POSTGRES_AUDIENCE") {
            config.postgres.audience = val;
        }
        if let Ok(val) = env::var("SQLSSO_POSTGRES_ADMIN_DATABASE") {
            config.postgres.admin_database = val;
        }

        // Operation
        if let Some(secs) = numeric_override("SQLSSO_OPERATION_TIMEOUT_SECS") {
            config.operation.timeout_secs = secs;
        }
    }
}

/// Accepts true/false, 1/0, yes/no and on/off, ignoring case
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn numeric_override<T: FromStr>(var: &str) -> Option<T> {
    let val = env::var(var).ok()?;
    match val.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(var = var, value = %val, "Ignoring invalid numeric override");
            None
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
