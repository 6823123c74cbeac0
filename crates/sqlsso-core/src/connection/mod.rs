//! Token-authenticated database connections
//!
//! A [`ConnectionFactory`] opens one exclusively owned [`DbConnection`] per
//! request. Connections are never pooled; the engine closes every handle it
//! opens, and dropping a handle mid-operation tears the socket down.

mod postgres;
mod sqlserver;

use async_trait::async_trait;
use sqlsso_token::AccessToken;

use crate::dialect::Statement;
use crate::error::ConnectionError;
use crate::model::Dialect;

pub use postgres::PostgresConnection;
pub use sqlserver::SqlServerConnection;

/// Where to connect. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub dialect: Dialect,
    pub server: String,
    pub port: u16,
    pub database: String,
    /// Login name; Postgres only, SQL Server identifies the caller from the token
    pub user: Option<String>,
}

impl ConnectTarget {
    /// Connection descriptor with the token left as a `{token}` placeholder.
    /// Safe to log and to include in diagnostics.
    pub fn descriptor(&self) -> String {
        match self.dialect {
            Dialect::SqlServer => format!(
                "Server={};Database={};Port={};",
                self.server, self.database, self.port
            ),
            Dialect::Postgres => format!(
                "postgres://{}:{{token}}@{}:{}/{}?sslmode=require",
                self.user.as_deref().unwrap_or_default(),
                self.server,
                self.port,
                self.database
            ),
        }
    }
}

/// A live connection owned by one operation
#[async_trait]
pub trait DbConnection: Send {
    /// Run one statement, returning the affected row count
    async fn execute(&mut self, statement: &Statement) -> Result<u64, ConnectionError>;

    /// Close the connection gracefully
    async fn close(self: Box<Self>) -> Result<(), ConnectionError>;
}

/// Opens connections using an access token as the credential
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn open(
        &self,
        target: &ConnectTarget,
        token: &AccessToken,
    ) -> Result<Box<dyn DbConnection>, ConnectionError>;
}

/// Real driver connections: `tiberius` for SQL Server, `sqlx` for Postgres
#[derive(Debug, Clone, Default)]
pub struct DriverConnectionFactory {
    trust_server_certificate: bool,
}

impl DriverConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept any SQL Server certificate. Local test containers only.
    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }
}

#[async_trait]
impl ConnectionFactory for DriverConnectionFactory {
    async fn open(
        &self,
        target: &ConnectTarget,
        token: &AccessToken,
    ) -> Result<Box<dyn DbConnection>, ConnectionError> {
        match target.dialect {
            Dialect::SqlServer => {
                let conn = SqlServerConnection::connect(
                    target,
                    token,
                    self.trust_server_certificate,
                )
                .await?;
                Ok(Box::new(conn))
            }
            Dialect::Postgres => {
                let conn = PostgresConnection::connect(target, token).await?;
                Ok(Box::new(conn))
            }
        }
    }
}
