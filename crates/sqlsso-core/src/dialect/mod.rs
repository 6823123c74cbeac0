//! Dialect strategies
//!
//! Each dialect turns a resolved account into the ordered statements that
//! create or drop it. Statements name the database they must run in; the
//! engine opens connections accordingly.

mod postgres;
mod sqlserver;

use crate::model::{Dialect, ResolvedAccount};

/// Which database a statement runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseContext {
    /// The database named in the account spec
    Target,
    /// The server's administrative database (Postgres only)
    Administrative,
}

/// One statement plus its positional parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub context: DatabaseContext,
    pub sql: String,
    pub params: Vec<String>,
}

impl Statement {
    pub(crate) fn new(context: DatabaseContext, sql: impl Into<String>) -> Self {
        Self {
            context,
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub(crate) fn bind(mut self, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self
    }
}

impl Dialect {
    /// Statements that create the principal and grant its role, in order
    pub fn create_statements(self, account: &ResolvedAccount<'_>) -> Vec<Statement> {
        match self {
            Dialect::SqlServer => sqlserver::create_account(account),
            Dialect::Postgres => postgres::create_account(account),
        }
    }

    /// Statements that remove the principal, in dependency order
    pub fn drop_statements(self, account: &ResolvedAccount<'_>) -> Vec<Statement> {
        match self {
            Dialect::SqlServer => sqlserver::drop_account(account),
            Dialect::Postgres => postgres::drop_account(account),
        }
    }
}
