// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types shared across the client.

/// Application error type.
///
/// Validation failures are kept distinct from remote-call failures so the UI
/// layer can surface them differently: validation errors block the attempted
/// operation synchronously, remote failures flow through the notice channel.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Backend API error: {0}")]
    Api(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Local store error: {0}")]
    LocalStore(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for synchronous input-validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    /// True when the failure means the user's credentials/session are no
    /// longer usable.
    pub fn is_auth(&self) -> bool {
        matches!(self, AppError::Unauthorized | AppError::Auth(_))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Flatten to the first human-readable message; single-field inputs
        // only ever carry one.
        let message = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .next()
            .unwrap_or_else(|| "invalid input".to_string());
        AppError::Validation(message)
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, AppError>;
