// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and auth-user models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// App-wide session slot, shared by the auth client and the request layers.
pub type SharedSession = Arc<RwLock<Option<Session>>>;

/// The authenticated user carried inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Opaque user id assigned by the auth backend
    pub id: String,
    /// Email address (may be absent for OAuth-only accounts)
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session issued by the auth backend.
///
/// Held in memory and mirrored into the local store so it survives restarts.
/// Presence of a session is the sole input to the authenticated routing
/// decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for table and storage requests (a JWT)
    pub access_token: String,
    /// Token used to obtain a fresh access token
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    /// The user this session belongs to
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}
