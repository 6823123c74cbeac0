//! sqlsso
//!
//! Command-line host for the account lifecycle:
//! - `create` / `read` / `update` / `delete` against JSON plan and state files
//! - `plan` to preview what `apply` would do
//! - `apply` to converge a state file on a plan (create, keep or replace)
//!
//! State JSON goes to stdout (or `--out`), diagnostics and logs to stderr.
//! The exit status is non-zero whenever an Error diagnostic was recorded.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use sqlsso_config::{AppConfig, ConfigLoader};
use sqlsso_core::{
    AccountRecord, AccountState, Diagnostics, DriverConnectionFactory, EngineSettings,
    LifecycleController, ProvisioningEngine,
};
use sqlsso_token::{create_token_source, TokenSource};

#[derive(Parser, Debug)]
#[command(name = "sqlsso")]
#[command(about = "Provision Azure AD database accounts on SQL Server and Postgres", version)]
struct Cli {
    /// Configuration file (default: SQLSSO_CONFIG, then the standard search paths)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the account described by a plan file and print its state
    Create {
        #[arg(long)]
        plan: PathBuf,
    },
    /// Print persisted state unchanged
    Read {
        #[arg(long)]
        state: PathBuf,
    },
    /// No-op; prints the persisted state
    Update {
        #[arg(long)]
        state: PathBuf,
        #[arg(long)]
        plan: PathBuf,
    },
    /// Drop the account recorded in a state file
    Delete {
        #[arg(long)]
        state: PathBuf,
    },
    /// Show whether applying a plan would create, keep or replace the account
    Plan {
        #[arg(long)]
        plan: PathBuf,
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Converge on a plan, writing the resulting state
    Apply {
        #[arg(long)]
        plan: PathBuf,
        #[arg(long)]
        state: Option<PathBuf>,
        /// Write state here instead of stdout; removed when no state remains
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print an example configuration file
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    sqlsso_common::logging::init_logging("sqlsso", "warn");

    let cli = Cli::parse();

    if matches!(cli.command, Command::ExampleConfig) {
        print!("{}", AppConfig::example_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let config = match &cli.config {
        Some(path) => ConfigLoader::with_path(path).load()?,
        None => ConfigLoader::new().load()?,
    };
    let controller = build_controller(&config)?;

    let mut diags = Diagnostics::new();
    let (interrupted, outcome) = tokio::select! {
        result = run(&controller, cli.command, &mut diags) => (false, result),
        _ = shutdown_signal() => (true, Ok(())),
    };

    if interrupted {
        warn!("Interrupted, in-flight operation cancelled");
        diags.add_error("cancelled", "operation interrupted before it finished");
    }

    report(&diags, outcome, &mut std::io::stderr())
}

/// Write every diagnostic, then surface the command's own error if it had one
fn report(
    diags: &Diagnostics,
    outcome: Result<()>,
    sink: &mut impl std::io::Write,
) -> Result<ExitCode> {
    for diagnostic in diags {
        writeln!(sink, "{}", diagnostic)?;
    }
    outcome?;

    Ok(if diags.has_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn build_controller(config: &AppConfig) -> Result<LifecycleController> {
    let tokens = create_token_source(&config.token)?;
    info!(token_source = tokens.name(), "Token source ready");

    let connections = DriverConnectionFactory::new()
        .trust_server_certificate(config.sqlserver.trust_server_certificate);
    let engine = ProvisioningEngine::new(
        tokens,
        Arc::new(connections),
        EngineSettings::from_config(config),
    );

    Ok(LifecycleController::new(engine).with_timeout(config.operation.timeout()))
}

async fn run(
    controller: &LifecycleController,
    command: Command,
    diags: &mut Diagnostics,
) -> Result<()> {
    match command {
        Command::Create { plan } => {
            let desired: AccountRecord = read_json(&plan)?;
            if let Some(state) = controller.create(&desired, diags).await {
                print_json(&state)?;
            }
        }
        Command::Read { state } => {
            let state: AccountState = read_json(&state)?;
            print_json(&controller.read(&state))?;
        }
        Command::Update { state, plan } => {
            let state: AccountState = read_json(&state)?;
            let desired: AccountRecord = read_json(&plan)?;
            print_json(&controller.update(&state, &desired))?;
        }
        Command::Delete { state } => {
            let state: AccountState = read_json(&state)?;
            controller.delete(&state, diags).await;
        }
        Command::Plan { plan, state } => {
            let desired: AccountRecord = read_json(&plan)?;
            let current = read_optional_state(state.as_deref())?;
            print_json(&controller.plan(current.as_ref(), &desired))?;
        }
        Command::Apply { plan, state, out } => {
            let desired: AccountRecord = read_json(&plan)?;
            let current = read_optional_state(state.as_deref())?;
            let next = controller.apply(current.as_ref(), &desired, diags).await;
            match out {
                Some(path) => write_state(&path, next.as_ref())?,
                None => {
                    if let Some(state) = &next {
                        print_json(state)?;
                    }
                }
            }
        }
        Command::ExampleConfig => print!("{}", AppConfig::example_toml()),
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// A missing state file means the account does not exist yet
fn read_optional_state(path: Option<&Path>) -> Result<Option<AccountState>> {
    match path {
        Some(path) if path.exists() => Ok(Some(read_json(path)?)),
        _ => Ok(None),
    }
}

fn write_state(path: &Path, state: Option<&AccountState>) -> Result<()> {
    match state {
        Some(state) => {
            let json = serde_json::to_string_pretty(state)?;
            std::fs::write(path, json + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None if path.exists() => {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        None => {}
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
