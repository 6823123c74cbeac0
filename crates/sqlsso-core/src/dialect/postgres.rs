//! Postgres family statements
//!
//! AAD principals are registered with `pgaadauth_create_principal`, which only
//! exists in the administrative database. Grants are database-level and run
//! against the target database.

use super::{DatabaseContext, Statement};
use crate::model::ResolvedAccount;

const CREATE_PRINCIPAL: &str =
    "SELECT * FROM pg_catalog.pgaadauth_create_principal($1, false, false)";

/// Double-quote an identifier, doubling embedded quotes
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub(super) fn create_account(account: &ResolvedAccount<'_>) -> Vec<Statement> {
    let spec = account.spec;
    vec![
        Statement::new(DatabaseContext::Administrative, CREATE_PRINCIPAL)
            .bind(&spec.principal_name),
        Statement::new(
            DatabaseContext::Target,
            format!(
                "GRANT {} ON DATABASE {} TO {}",
                account.role_name(),
                quote_ident(&spec.database),
                quote_ident(&spec.principal_name)
            ),
        ),
    ]
}

pub(super) fn drop_account(account: &ResolvedAccount<'_>) -> Vec<Statement> {
    let spec = account.spec;
    vec![
        Statement::new(
            DatabaseContext::Target,
            format!(
                "REVOKE {} ON DATABASE {} FROM {}",
                account.role_name(),
                quote_ident(&spec.database),
                quote_ident(&spec.principal_name)
            ),
        ),
        Statement::new(
            DatabaseContext::Administrative,
            format!("DROP ROLE {}", quote_ident(&spec.principal_name)),
        ),
    ]
}
