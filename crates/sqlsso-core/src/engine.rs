//! Account Provisioning Engine
//!
//! Runs a dialect's statement sequence for one account. Statements are grouped
//! by the database they target; each group gets its own connection opened with
//! a freshly acquired token, and every connection is closed before the next
//! group starts.

use sqlsso_config::{AppConfig, PostgresConfig, SqlServerConfig};
use sqlsso_token::TokenSource;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};

use crate::connection::{ConnectTarget, ConnectionFactory};
use crate::diagnostics::Diagnostics;
use crate::dialect::{DatabaseContext, Statement};
use crate::error::ProvisionError;
use crate::model::{AccountSpec, Dialect, ResolvedAccount};

/// Audiences and database names the engine needs beyond the account spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub sqlserver_audience: String,
    pub postgres_audience: String,
    pub postgres_admin_database: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let sqlserver = SqlServerConfig::default();
        let postgres = PostgresConfig::default();
        Self {
            sqlserver_audience: sqlserver.audience,
            postgres_audience: postgres.audience,
            postgres_admin_database: postgres.admin_database,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sqlserver_audience: config.sqlserver.audience.clone(),
            postgres_audience: config.postgres.audience.clone(),
            postgres_admin_database: config.postgres.admin_database.clone(),
        }
    }

    pub fn audience(&self, dialect: Dialect) -> &str {
        match dialect {
            Dialect::SqlServer => &self.sqlserver_audience,
            Dialect::Postgres => &self.postgres_audience,
        }
    }
}

fn operation_span(operation: &'static str, spec: &AccountSpec) -> tracing::Span {
    info_span!(
        "account_operation",
        operation,
        resource_id = %spec.identity(),
        dialect = %spec.dialect,
        account = %spec.principal_name
    )
}

/// What to do after a statement fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnStatementError {
    Stop,
    Continue,
}

pub struct ProvisioningEngine {
    tokens: Arc<dyn TokenSource>,
    connections: Arc<dyn ConnectionFactory>,
    settings: EngineSettings,
}

impl ProvisioningEngine {
    pub fn new(
        tokens: Arc<dyn TokenSource>,
        connections: Arc<dyn ConnectionFactory>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            tokens,
            connections,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Create the principal and grant its role. Stops at the first failing
    /// statement; earlier statements are not rolled back.
    pub async fn provision(&self, spec: &AccountSpec, diags: &mut Diagnostics) {
        let Some(account) = spec.resolve(diags) else {
            return;
        };
        let statements = spec.dialect.create_statements(&account);
        let span = operation_span("provision", spec);
        self.run(&account, &statements, OnStatementError::Stop, diags)
            .instrument(span)
            .await;
    }

    /// Drop the principal. Every statement is attempted and each failure is
    /// reported; token and connection failures still end the operation.
    pub async fn deprovision(&self, spec: &AccountSpec, diags: &mut Diagnostics) {
        let Some(account) = spec.resolve(diags) else {
            return;
        };
        let statements = spec.dialect.drop_statements(&account);
        let span = operation_span("deprovision", spec);
        self.run(&account, &statements, OnStatementError::Continue, diags)
            .instrument(span)
            .await;
    }

    async fn run(
        &self,
        account: &ResolvedAccount<'_>,
        statements: &[Statement],
        on_error: OnStatementError,
        diags: &mut Diagnostics,
    ) {
        for group in statements.chunk_by(|a, b| a.context == b.context) {
            let target = self.connect_target(account.spec, group[0].context);
            if !self.run_session(account, &target, group, on_error, diags).await {
                return;
            }
        }
    }

    /// Run one group of statements on one connection. Returns whether the
    /// operation should go on to the next group.
    async fn run_session(
        &self,
        account: &ResolvedAccount<'_>,
        target: &ConnectTarget,
        statements: &[Statement],
        on_error: OnStatementError,
        diags: &mut Diagnostics,
    ) -> bool {
        let spec = account.spec;

        let token = match self.tokens.acquire(self.settings.audience(spec.dialect)).await {
            Ok(token) => token,
            Err(source) => {
                diags.push_error(&ProvisionError::Credential {
                    provider: self.tokens.name().to_string(),
                    source,
                });
                return false;
            }
        };

        let descriptor = target.descriptor();
        let mut conn = match self.connections.open(target, &token).await {
            Ok(conn) => conn,
            Err(source) => {
                diags.push_error(&ProvisionError::Connection { descriptor, source });
                return false;
            }
        };
        drop(token);

        let mut proceed = true;
        for statement in statements {
            debug!(
                account = %spec.principal_name,
                role = account.role_name(),
                dialect = %spec.dialect,
                database = %target.database,
                sql = %statement.sql,
                "Executing statement"
            );

            if let Err(e) = conn.execute(statement).await {
                diags.push_error(&ProvisionError::Statement {
                    statement: statement.sql.clone(),
                    descriptor: descriptor.clone(),
                    message: e.to_string(),
                });
                if on_error == OnStatementError::Stop {
                    proceed = false;
                    break;
                }
            }
        }

        if let Err(e) = conn.close().await {
            warn!(descriptor = %descriptor, error = %e, "Failed to close connection");
            diags.add_warning("connection close failed", format!("({}): {}", descriptor, e));
        }

        proceed
    }

    fn connect_target(&self, spec: &AccountSpec, context: DatabaseContext) -> ConnectTarget {
        let database = match context {
            DatabaseContext::Target => spec.database.clone(),
            DatabaseContext::Administrative => self.settings.postgres_admin_database.clone(),
        };
        let user = match spec.dialect {
            Dialect::SqlServer => None,
            Dialect::Postgres => Some(spec.identity_ref.clone()),
        };

        ConnectTarget {
            dialect: spec.dialect,
            server: spec.server.clone(),
            port: spec.port,
            database,
            user,
        }
    }
}
