//! Postgres connections (sqlx)

use async_trait::async_trait;
use sqlsso_token::AccessToken;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;

use super::{ConnectTarget, DbConnection};
use crate::dialect::Statement;
use crate::error::ConnectionError;

pub struct PostgresConnection {
    conn: PgConnection,
}

/// The token goes in as the password, transport encryption is mandatory.
fn connect_options(target: &ConnectTarget, token: &AccessToken) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&target.server)
        .port(target.port)
        .username(target.user.as_deref().unwrap_or_default())
        .password(token.secret())
        .database(&target.database)
        .ssl_mode(PgSslMode::Require)
        .application_name("sqlsso")
}

impl PostgresConnection {
    pub async fn connect(
        target: &ConnectTarget,
        token: &AccessToken,
    ) -> Result<Self, ConnectionError> {
        let conn = PgConnection::connect_with(&connect_options(target, token)).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl DbConnection for PostgresConnection {
    async fn execute(&mut self, statement: &Statement) -> Result<u64, ConnectionError> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = query.bind(param.as_str());
        }
        let result = query.execute(&mut self.conn).await?;
        Ok(result.rows_affected())
    }

    async fn close(self: Box<Self>) -> Result<(), ConnectionError> {
        self.conn.close().await?;
        Ok(())
    }
}
