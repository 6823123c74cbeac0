//! Shared plumbing for the sqlsso crates.

pub mod logging;
