//! SQL Server family statements
//!
//! `CREATE USER`, `ALTER ROLE` and `DROP USER` do not accept parameters for
//! identifiers, so each statement builds dynamic SQL server-side from bound
//! values and quotes identifiers with `QUOTENAME`.

use super::{DatabaseContext, Statement};
use crate::model::ResolvedAccount;

const CREATE_USER: &str = "DECLARE @sql nvarchar(max) = N'CREATE USER ' + QUOTENAME(@P1) \
+ N' WITH SID = ' + CONVERT(varchar(64), CAST(CAST(@P2 AS UNIQUEIDENTIFIER) AS VARBINARY(16)), 1) \
+ N', TYPE = ' + @P3; EXEC (@sql);";

const ADD_ROLE_MEMBER: &str = "DECLARE @sql nvarchar(max) = N'ALTER ROLE ' + QUOTENAME(@P1) \
+ N' ADD MEMBER ' + QUOTENAME(@P2); EXEC (@sql);";

const DROP_USER: &str = "DECLARE @sql nvarchar(max) = N'DROP USER ' + QUOTENAME(@P1); EXEC (@sql);";

pub(super) fn create_account(account: &ResolvedAccount<'_>) -> Vec<Statement> {
    let spec = account.spec;
    vec![
        Statement::new(DatabaseContext::Target, CREATE_USER)
            .bind(&spec.principal_name)
            .bind(&spec.identity_ref)
            .bind(account.type_code()),
        Statement::new(DatabaseContext::Target, ADD_ROLE_MEMBER)
            .bind(account.role_name())
            .bind(&spec.principal_name),
    ]
}

pub(super) fn drop_account(account: &ResolvedAccount<'_>) -> Vec<Statement> {
    vec![Statement::new(DatabaseContext::Target, DROP_USER).bind(&account.spec.principal_name)]
}
