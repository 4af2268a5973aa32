// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session gate: the top-level authenticated/unauthenticated routing input.
//!
//! Entered once at startup. The gate checks for a persisted session while a
//! splash view is up, enforces a minimum splash duration independent of how
//! fast the check resolves, then follows auth state changes for the rest of
//! the process lifetime.

use crate::services::AuthClient;
use std::time::Duration;
use tokio::sync::watch;

/// Gate states. `Checking` is only ever observed during startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Checking,
    Authenticated,
    Unauthenticated,
}

/// Handle to the gate's state.
#[derive(Clone)]
pub struct SessionGate {
    rx: watch::Receiver<GateState>,
}

impl SessionGate {
    /// Start the gate. Must be called within a Tokio runtime.
    pub fn spawn(auth: AuthClient, splash_min: Duration) -> Self {
        let (tx, rx) = watch::channel(GateState::Checking);

        tokio::spawn(async move {
            // Subscribe before the restore so a sign-in racing the startup
            // check is never missed.
            let mut changes = auth.on_auth_state_change();

            let splash = tokio::time::sleep(splash_min);
            tokio::pin!(splash);

            let restored = auth.restore_session().await;

            // The splash stays up for at least `splash_min` even when the
            // session check resolved first.
            splash.as_mut().await;

            let initial = match restored {
                Ok(Some(user)) => {
                    tracing::info!(user_id = %user.id, "Session restored");
                    GateState::Authenticated
                }
                Ok(None) => GateState::Unauthenticated,
                Err(e) => {
                    tracing::warn!(error = %e, "Session restore failed");
                    GateState::Unauthenticated
                }
            };
            tx.send_replace(initial);

            // Follow sign-in/sign-out for the rest of the process lifetime.
            while changes.changed().await.is_ok() {
                let state = if changes.borrow_and_update().is_some() {
                    GateState::Authenticated
                } else {
                    GateState::Unauthenticated
                };
                if tx.send(state).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }

    /// The current gate state.
    pub fn state(&self) -> GateState {
        *self.rx.borrow()
    }

    /// Observe gate transitions.
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.rx.clone()
    }

    /// Wait for the startup check to resolve, returning the first
    /// non-`Checking` state.
    pub async fn resolved(&self) -> GateState {
        let mut rx = self.rx.clone();
        loop {
            {
                let state = *rx.borrow_and_update();
                if state != GateState::Checking {
                    return state;
                }
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }
}
