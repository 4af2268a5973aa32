//! Profile model for the remote `profiles` table.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// User profile row, keyed by the authenticated user's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Auth user id (also the row key)
    pub id: String,
    /// Display name
    #[serde(default)]
    pub username: Option<String>,
    /// Email address, duplicated from the auth record
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar image URL in object storage
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Personal website
    #[serde(default)]
    pub website: Option<String>,
    /// Last save timestamp (ISO 8601)
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Editable profile fields, validated before the upsert.
#[derive(Debug, Clone, Default, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 64, message = "username must be 1-64 characters"))]
    pub username: Option<String>,
    #[validate(url(message = "website must be a valid URL"))]
    pub website: Option<String>,
    pub avatar_url: Option<String>,
}
