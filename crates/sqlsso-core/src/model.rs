//! Account model and backend lookup tables

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diagnostics::Diagnostics;
use crate::error::ProvisionError;

/// Backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    SqlServer,
    Postgres,
}

impl Dialect {
    pub const fn default_port(self) -> u16 {
        match self {
            Dialect::SqlServer => 1433,
            Dialect::Postgres => 5432,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Dialect::SqlServer => "sqlserver",
            Dialect::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountKind {
    User,
    Group,
}

const ACCOUNT_KINDS: &[(&str, AccountKind)] = &[
    ("user", AccountKind::User),
    ("group", AccountKind::Group),
];

impl AccountKind {
    /// Look up a configured kind name. Names are matched exactly.
    pub fn resolve(name: &str) -> Result<Self, ProvisionError> {
        ACCOUNT_KINDS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| {
                ProvisionError::Configuration(format!(
                    "invalid account type {:?}: expected one of {:?}",
                    name,
                    Self::names()
                ))
            })
    }

    pub fn names() -> Vec<&'static str> {
        ACCOUNT_KINDS.iter().map(|(key, _)| *key).collect()
    }

    /// `TYPE` argument of SQL Server's `CREATE USER ... WITH SID`
    pub const fn type_code(self) -> &'static str {
        match self {
            AccountKind::User => "E",
            AccountKind::Group => "X",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Owner,
    Reader,
    Writer,
}

const ROLES: &[(&str, Role)] = &[
    ("owner", Role::Owner),
    ("reader", Role::Reader),
    ("writer", Role::Writer),
];

impl Role {
    /// Look up a configured role name. Names are matched exactly.
    pub fn resolve(name: &str) -> Result<Self, ProvisionError> {
        ROLES
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, role)| *role)
            .ok_or_else(|| {
                ProvisionError::Configuration(format!(
                    "invalid role {:?}: expected one of {:?}",
                    name,
                    Self::names()
                ))
            })
    }

    pub fn names() -> Vec<&'static str> {
        ROLES.iter().map(|(key, _)| *key).collect()
    }

    /// Fixed database role on SQL Server
    pub const fn sqlserver_role(self) -> &'static str {
        match self {
            Role::Owner => "db_owner",
            Role::Reader => "db_datareader",
            Role::Writer => "db_datawriter",
        }
    }

    /// Database-level privilege list on Postgres
    pub const fn postgres_privileges(self) -> &'static str {
        match self {
            Role::Owner => "ALL PRIVILEGES",
            Role::Reader => "CONNECT",
            Role::Writer => "CONNECT, TEMPORARY",
        }
    }

    pub const fn backend_name(self, dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::SqlServer => self.sqlserver_role(),
            Dialect::Postgres => self.postgres_privileges(),
        }
    }
}

/// Durable key of a managed account: `server:database:port/principal`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIdentity(String);

impl ResourceIdentity {
    pub fn new(server: &str, database: &str, port: u16, principal_name: &str) -> Self {
        Self(format!("{}:{}:{}/{}", server, database, port, principal_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One account to provision, built fresh from the host payload for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSpec {
    pub dialect: Dialect,
    pub server: String,
    pub database: String,
    pub port: u16,
    pub principal_name: String,
    /// SQL Server: AAD object id bound as the SID.
    /// Postgres: the user name the connection logs in as.
    pub identity_ref: String,
    /// SQL Server only
    pub account_kind: Option<String>,
    pub role: String,
}

impl AccountSpec {
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(&self.server, &self.database, self.port, &self.principal_name)
    }

    /// Resolve kind and role through the lookup tables, appending one Error per
    /// unresolvable value. Returns `None` if anything failed.
    pub fn resolve(&self, diags: &mut Diagnostics) -> Option<ResolvedAccount<'_>> {
        let kind = match (self.dialect, self.account_kind.as_deref()) {
            (Dialect::SqlServer, Some(name)) => match AccountKind::resolve(name) {
                Ok(kind) => Some(kind),
                Err(err) => {
                    diags.push_error(&err);
                    None
                }
            },
            (Dialect::SqlServer, None) => {
                diags.push_error(&ProvisionError::Configuration(
                    "account type is required for SQL Server accounts".to_string(),
                ));
                None
            }
            (Dialect::Postgres, _) => None,
        };

        let role = match Role::resolve(&self.role) {
            Ok(role) => Some(role),
            Err(err) => {
                diags.push_error(&err);
                None
            }
        };

        let role = role?;
        if self.dialect == Dialect::SqlServer && kind.is_none() {
            return None;
        }

        Some(ResolvedAccount {
            spec: self,
            kind,
            role,
        })
    }
}

/// An [`AccountSpec`] whose kind and role went through the lookup tables.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAccount<'a> {
    pub spec: &'a AccountSpec,
    /// Always `Some` for SQL Server
    pub kind: Option<AccountKind>,
    pub role: Role,
}

impl ResolvedAccount<'_> {
    pub fn type_code(&self) -> &'static str {
        self.kind.unwrap_or(AccountKind::User).type_code()
    }

    pub fn role_name(&self) -> &'static str {
        self.role.backend_name(self.spec.dialect)
    }
}
