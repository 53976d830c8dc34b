//! Disposal guard.
//!
//! ```text
//! ┌────────┐ begin_dispose ┌───────────┐ finish_dispose ┌──────────┐
//! │ Active │──────────────>│ Disposing │───────────────>│ Disposed │
//! └────────┘               └───────────┘                └──────────┘
//! ```
//!
//! Transitions only move forward. Only the first `begin_dispose` wins; every
//! later call sees a non-`Active` state and backs off.

use tokio::sync::watch;

use crate::error::ClientError;

/// Disposal state of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Usable.
    Active,
    /// Teardown in progress; operations fail.
    Disposing,
    /// Teardown finished; operations fail.
    Disposed,
}

/// Tri-state guard checked by every public client operation.
///
/// Backed by a watch channel so callers can await the end of teardown.
#[derive(Debug)]
pub(crate) struct LifecycleGuard {
    state: watch::Sender<LifecycleState>,
}

impl LifecycleGuard {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Active);
        Self { state }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Fail with [`ClientError::Disposed`] unless still active.
    pub(crate) fn ensure_active(&self) -> Result<(), ClientError> {
        match self.state() {
            LifecycleState::Active => Ok(()),
            LifecycleState::Disposing | LifecycleState::Disposed => Err(ClientError::Disposed),
        }
    }

    /// Move `Active -> Disposing`.
    ///
    /// Returns `false` if disposal already began; the caller must not run
    /// teardown again.
    pub(crate) fn begin_dispose(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == LifecycleState::Active {
                *state = LifecycleState::Disposing;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn finish_dispose(&self) {
        self.state.send_replace(LifecycleState::Disposed);
    }

    pub(crate) async fn wait_disposed(&self) {
        let mut state = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns on Disposed.
        let _ = state.wait_for(|state| *state == LifecycleState::Disposed).await;
    }
}
