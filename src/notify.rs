// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Non-blocking user-visible notices for remote failures.
//!
//! Every screen subscribes to one broadcast channel instead of each picking
//! between silent drops and blocking alert dialogs. Validation failures never
//! land here; they are returned synchronously to the caller.

use crate::error::AppError;
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 32;

/// A user-visible notice about a failed remote operation.
#[derive(Debug, Clone)]
pub struct Notice {
    /// Short name of the operation that failed, e.g. `fetch_tasks`
    pub operation: &'static str,
    /// Human-readable failure message
    pub message: String,
}

/// Shared handle for emitting notices.
#[derive(Clone)]
pub struct Notifier {
    tx: Arc<broadcast::Sender<Notice>>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to notices. Slow consumers may observe lagged gaps; notices
    /// are advisory, not a durable log.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Log a failed remote operation and emit one notice for it.
    ///
    /// Validation errors are the caller's to surface and are ignored here.
    pub(crate) fn report(&self, operation: &'static str, error: &AppError) {
        if error.is_validation() {
            return;
        }
        tracing::error!(operation, error = %error, "Remote operation failed");
        let _ = self.tx.send(Notice {
            operation,
            message: error.to_string(),
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
