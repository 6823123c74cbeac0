//! Lifecycle Controller
//!
//! Maps host create/read/update/delete onto the engine. Accounts are
//! replace-only: any attribute change is planned as delete-then-create, and
//! update never touches the backend.

use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::diagnostics::Diagnostics;
use crate::engine::ProvisioningEngine;
use crate::error::ProvisionError;
use crate::resource::{AccountRecord, AccountState};

/// What applying a desired record to the current state would do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    Create,
    NoOp,
    Replace { changed: Vec<&'static str> },
}

pub struct LifecycleController {
    engine: ProvisioningEngine,
    timeout: Option<Duration>,
}

impl LifecycleController {
    pub fn new(engine: ProvisioningEngine) -> Self {
        Self {
            engine,
            timeout: None,
        }
    }

    /// Deadline for each create and delete. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provision `desired` and return its state, or `None` if any Error was
    /// recorded. Nothing is persisted for a partial create.
    pub async fn create(
        &self,
        desired: &AccountRecord,
        diags: &mut Diagnostics,
    ) -> Option<AccountState> {
        let errors_before = diags.error_count();
        if !desired.validate(diags) {
            return None;
        }

        let resource = desired.with_defaults();
        let spec = resource.to_spec();
        let id = spec.identity();
        info!(id = %id, kind = resource.type_name(), "Creating account");

        let outcome = self.within_deadline(self.engine.provision(&spec, diags)).await;
        if let Err(e) = outcome {
            diags.push_error(&e);
        }

        if diags.error_count() > errors_before {
            warn!(id = %id, "Account create failed");
            return None;
        }

        info!(id = %id, "Account created");
        Some(AccountState { id, resource })
    }

    /// Persisted state is returned as-is; the backend is not consulted.
    pub fn read(&self, state: &AccountState) -> AccountState {
        info!(id = %state.id, "Reading account");
        state.clone()
    }

    /// Always a no-op. Attribute changes go through [`Self::plan`] as a replace.
    pub fn update(&self, state: &AccountState, desired: &AccountRecord) -> AccountState {
        if state.resource.attributes() != desired.attributes() {
            warn!(id = %state.id, "Update ignored; changed attributes require replacement");
        }
        state.clone()
    }

    /// Drop the account recorded in `state`. Errors are reported, but the
    /// caller is expected to forget the state regardless.
    pub async fn delete(&self, state: &AccountState, diags: &mut Diagnostics) {
        let spec = state.resource.to_spec();
        info!(id = %state.id, kind = state.resource.type_name(), "Deleting account");

        let errors_before = diags.error_count();
        let outcome = self.within_deadline(self.engine.deprovision(&spec, diags)).await;
        if let Err(e) = outcome {
            diags.push_error(&e);
        }

        if diags.error_count() > errors_before {
            warn!(id = %state.id, "Account delete reported errors");
        } else {
            info!(id = %state.id, "Account deleted");
        }
    }

    /// Compare current state against a desired record, after defaults.
    /// Every attribute forces replacement.
    pub fn plan(&self, current: Option<&AccountState>, desired: &AccountRecord) -> PlannedAction {
        let Some(state) = current else {
            return PlannedAction::Create;
        };

        let mut changed = Vec::new();
        if state.resource.type_name() != desired.type_name() {
            changed.push("type");
        } else {
            let before = state.resource.attributes();
            let after = desired.attributes();
            for ((name, old), (_, new)) in before.iter().zip(after.iter()) {
                if old != new {
                    changed.push(*name);
                }
            }
        }

        if changed.is_empty() {
            PlannedAction::NoOp
        } else {
            PlannedAction::Replace { changed }
        }
    }

    /// Converge on `desired`: create when absent, keep when unchanged,
    /// delete then create when anything changed. Returns the state to persist.
    ///
    /// An invalid `desired` is rejected before anything is dropped, and the
    /// current state is kept.
    pub async fn apply(
        &self,
        current: Option<&AccountState>,
        desired: &AccountRecord,
        diags: &mut Diagnostics,
    ) -> Option<AccountState> {
        if !self.accepts(desired, diags) {
            warn!("Desired account rejected; keeping current state");
            return current.cloned();
        }

        match (self.plan(current, desired), current) {
            (PlannedAction::NoOp, Some(state)) => Some(self.read(state)),
            (PlannedAction::Replace { changed }, Some(state)) => {
                info!(id = %state.id, changed = ?changed, "Replacing account");
                let errors_before = diags.error_count();
                self.delete(state, diags).await;
                if diags.error_count() > errors_before {
                    return None;
                }
                self.create(desired, diags).await
            }
            _ => self.create(desired, diags).await,
        }
    }

    /// Field checks plus kind and role resolution, without touching the backend
    fn accepts(&self, desired: &AccountRecord, diags: &mut Diagnostics) -> bool {
        let errors_before = diags.error_count();
        if desired.validate(diags) {
            let spec = desired.with_defaults().to_spec();
            let _ = spec.resolve(diags);
        }
        diags.error_count() == errors_before
    }

    async fn within_deadline<F>(&self, operation: F) -> Result<(), ProvisionError>
    where
        F: Future<Output = ()>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| ProvisionError::Timeout(limit)),
            None => {
                operation.await;
                Ok(())
            }
        }
    }
}
