// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Settings persisted in the device cache.

use crate::db::{keys, LocalStore};
use crate::error::AppError;
use std::sync::Arc;

/// User-facing settings.
///
/// The notification toggle gates the settings screen's task listing only;
/// there is no delivery mechanism behind it.
#[derive(Clone)]
pub struct Settings {
    local: Arc<LocalStore>,
}

impl Settings {
    pub fn new(local: Arc<LocalStore>) -> Self {
        Self { local }
    }

    pub fn notifications_enabled(&self) -> bool {
        self.local.get(keys::NOTIFICATIONS_ENABLED).as_deref() == Some("true")
    }

    pub fn set_notifications_enabled(&self, enabled: bool) -> Result<(), AppError> {
        self.local
            .set(keys::NOTIFICATIONS_ENABLED, if enabled { "true" } else { "false" })
    }
}
