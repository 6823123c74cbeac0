//! Host-facing account records
//!
//! Records arrive as JSON tagged with their resource type. Optional attributes
//! take their defaults before a record is persisted, so stored state always
//! carries the values that were actually used.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::ProvisionError;
use crate::model::{AccountSpec, Dialect, ResourceIdentity};

pub const DEFAULT_ACCOUNT_TYPE: &str = "user";
pub const DEFAULT_ROLE: &str = "reader";

/// `mssql_server_aad_account`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlServerAccount {
    pub sql_server_dns: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub account_name: String,
    /// AAD object id (GUID) of the user or group
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// `postgresql_server_aad_account`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresAccount {
    pub sql_server_dns: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Administrator the connection logs in as
    pub user_name: String,
    pub account_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AccountRecord {
    #[serde(rename = "mssql_server_aad_account")]
    SqlServer(SqlServerAccount),
    #[serde(rename = "postgresql_server_aad_account")]
    Postgres(PostgresAccount),
}

/// A record as persisted after a successful create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub id: ResourceIdentity,
    pub resource: AccountRecord,
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}

fn require(diags: &mut Diagnostics, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        diags.push_error(&ProvisionError::Configuration(format!("{} is required", field)));
        return false;
    }
    true
}

impl AccountRecord {
    pub fn type_name(&self) -> &'static str {
        match self {
            AccountRecord::SqlServer(_) => "mssql_server_aad_account",
            AccountRecord::Postgres(_) => "postgresql_server_aad_account",
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            AccountRecord::SqlServer(_) => Dialect::SqlServer,
            AccountRecord::Postgres(_) => Dialect::Postgres,
        }
    }

    /// Fill in every optional attribute that was left out
    pub fn with_defaults(&self) -> Self {
        let port = Some(self.port().unwrap_or(self.dialect().default_port()));
        match self {
            AccountRecord::SqlServer(r) => AccountRecord::SqlServer(SqlServerAccount {
                port,
                account_type: Some(or_default(&r.account_type, DEFAULT_ACCOUNT_TYPE)),
                role: Some(or_default(&r.role, DEFAULT_ROLE)),
                ..r.clone()
            }),
            AccountRecord::Postgres(r) => AccountRecord::Postgres(PostgresAccount {
                port,
                role: Some(or_default(&r.role, DEFAULT_ROLE)),
                ..r.clone()
            }),
        }
    }

    fn port(&self) -> Option<u16> {
        match self {
            AccountRecord::SqlServer(r) => r.port,
            AccountRecord::Postgres(r) => r.port,
        }
    }

    /// Check required attributes, appending one Error per problem.
    /// Kind and role names are checked later, by the engine.
    pub fn validate(&self, diags: &mut Diagnostics) -> bool {
        let mut ok = true;
        match self {
            AccountRecord::SqlServer(r) => {
                ok &= require(diags, "sql_server_dns", &r.sql_server_dns);
                ok &= require(diags, "database", &r.database);
                ok &= require(diags, "account_name", &r.account_name);
                ok &= require(diags, "object_id", &r.object_id);
            }
            AccountRecord::Postgres(r) => {
                ok &= require(diags, "sql_server_dns", &r.sql_server_dns);
                ok &= require(diags, "database", &r.database);
                ok &= require(diags, "user_name", &r.user_name);
                ok &= require(diags, "account_name", &r.account_name);
            }
        }
        if self.port() == Some(0) {
            diags.push_error(&ProvisionError::Configuration("port must be non-zero".to_string()));
            ok = false;
        }
        ok
    }

    /// Engine input with defaults applied
    pub fn to_spec(&self) -> AccountSpec {
        let port = self.port().unwrap_or(self.dialect().default_port());
        match self {
            AccountRecord::SqlServer(r) => AccountSpec {
                dialect: Dialect::SqlServer,
                server: r.sql_server_dns.clone(),
                database: r.database.clone(),
                port,
                principal_name: r.account_name.clone(),
                identity_ref: r.object_id.clone(),
                account_kind: Some(or_default(&r.account_type, DEFAULT_ACCOUNT_TYPE)),
                role: or_default(&r.role, DEFAULT_ROLE),
            },
            AccountRecord::Postgres(r) => AccountSpec {
                dialect: Dialect::Postgres,
                server: r.sql_server_dns.clone(),
                database: r.database.clone(),
                port,
                principal_name: r.account_name.clone(),
                identity_ref: r.user_name.clone(),
                account_kind: None,
                role: or_default(&r.role, DEFAULT_ROLE),
            },
        }
    }

    pub fn identity(&self) -> ResourceIdentity {
        self.to_spec().identity()
    }

    /// Attribute name/value pairs after defaults, in declaration order
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let port = self.port().unwrap_or(self.dialect().default_port()).to_string();
        match self {
            AccountRecord::SqlServer(r) => vec![
                ("sql_server_dns", r.sql_server_dns.clone()),
                ("database", r.database.clone()),
                ("port", port),
                ("account_name", r.account_name.clone()),
                ("object_id", r.object_id.clone()),
                ("account_type", or_default(&r.account_type, DEFAULT_ACCOUNT_TYPE)),
                ("role", or_default(&r.role, DEFAULT_ROLE)),
            ],
            AccountRecord::Postgres(r) => vec![
                ("sql_server_dns", r.sql_server_dns.clone()),
                ("database", r.database.clone()),
                ("port", port),
                ("user_name", r.user_name.clone()),
                ("account_name", r.account_name.clone()),
                ("role", or_default(&r.role, DEFAULT_ROLE)),
            ],
        }
    }
}
