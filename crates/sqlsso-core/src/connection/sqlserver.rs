//! SQL Server connections over TDS (tiberius)

use async_trait::async_trait;
use sqlsso_token::AccessToken;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use super::{ConnectTarget, DbConnection};
use crate::dialect::Statement;
use crate::error::ConnectionError;

pub struct SqlServerConnection {
    client: Client<Compat<TcpStream>>,
}

fn client_config(
    target: &ConnectTarget,
    token: &AccessToken,
    trust_server_certificate: bool,
) -> Config {
    let mut config = Config::new();
    config.host(&target.server);
    config.port(target.port);
    config.database(&target.database);
    config.application_name("sqlsso");
    config.authentication(AuthMethod::aad_token(token.secret()));
    config.encryption(EncryptionLevel::Required);
    if trust_server_certificate {
        config.trust_cert();
    }
    config
}

async fn open_stream(config: &Config) -> Result<Compat<TcpStream>, ConnectionError> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Ok(tcp.compat_write())
}

impl SqlServerConnection {
    pub async fn connect(
        target: &ConnectTarget,
        token: &AccessToken,
        trust_server_certificate: bool,
    ) -> Result<Self, ConnectionError> {
        let config = client_config(target, token, trust_server_certificate);
        let stream = open_stream(&config).await?;

        let client = match Client::connect(config, stream).await {
            Ok(client) => client,
            // Azure SQL gateways answer the first login with a redirect
            Err(tiberius::error::Error::Routing { host, port }) => {
                debug!(host = %host, port, "Following SQL Server gateway redirect");
                let mut config = client_config(target, token, trust_server_certificate);
                config.host(&host);
                config.port(port);
                let stream = open_stream(&config).await?;
                Client::connect(config, stream).await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { client })
    }
}

#[async_trait]
impl DbConnection for SqlServerConnection {
    async fn execute(&mut self, statement: &Statement) -> Result<u64, ConnectionError> {
        let params: Vec<&dyn ToSql> = statement.params.iter().map(|p| p as &dyn ToSql).collect();
        let result = self.client.execute(statement.sql.as_str(), &params).await?;
        Ok(result.total())
    }

    async fn close(self: Box<Self>) -> Result<(), ConnectionError> {
        self.client.close().await?;
        Ok(())
    }
}
