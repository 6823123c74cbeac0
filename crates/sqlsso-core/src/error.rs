//! Error types for provisioning operations

use sqlsso_token::TokenError;
use std::time::Duration;
use thiserror::Error;

/// Failure opening or using a driver connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("SQL Server: {0}")]
    SqlServer(#[from] tiberius::error::Error),

    #[error("Postgres: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Everything that can make a provisioning operation fail.
///
/// None of these are retried; each ends up as one Error diagnostic.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Invalid or unresolvable input, detected before any network call
    #[error("{0}")]
    Configuration(String),

    #[error("failed to acquire access token from {provider}: {source}")]
    Credential {
        provider: String,
        #[source]
        source: TokenError,
    },

    #[error("failed to connect ({descriptor}): {source}")]
    Connection {
        descriptor: String,
        #[source]
        source: ConnectionError,
    },

    #[error("error executing statement ({statement}) ({descriptor}): {message}")]
    Statement {
        statement: String,
        descriptor: String,
        message: String,
    },

    #[error("operation did not finish within {0:?}")]
    Timeout(Duration),
}

impl ProvisionError {
    /// Short diagnostic summary for the error class
    pub fn summary(&self) -> &'static str {
        match self {
            ProvisionError::Configuration(_) => "configuration error",
            ProvisionError::Credential { .. } => "credential error",
            ProvisionError::Connection { .. } => "connection error",
            ProvisionError::Statement { .. } => "statement error",
            ProvisionError::Timeout(_) => "timeout",
        }
    }
}
