//! sqlsso Account Provisioning Engine
//!
//! Creates and drops database principals that log in with Azure AD tokens:
//!
//! - [`model`]: account specs, kind/role lookup tables, resource identity
//! - [`dialect`]: ordered DDL sequences for SQL Server and Postgres
//! - [`connection`]: token-authenticated driver connections
//! - [`engine`]: provision / deprovision over one account
//! - [`lifecycle`]: create / read / update / delete with replace-only semantics
//!
//! Operations report failures by appending to a [`Diagnostics`] accumulator;
//! an operation failed if any entry has Error severity.

pub mod connection;
pub mod diagnostics;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod resource;

pub use connection::{ConnectTarget, ConnectionFactory, DbConnection, DriverConnectionFactory};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use dialect::{DatabaseContext, Statement};
pub use engine::{EngineSettings, ProvisioningEngine};
pub use error::{ConnectionError, ProvisionError};
pub use lifecycle::{LifecycleController, PlannedAction};
pub use model::{AccountKind, AccountSpec, Dialect, ResolvedAccount, ResourceIdentity, Role};
pub use resource::{AccountRecord, AccountState, PostgresAccount, SqlServerAccount};
