//! Data access layer: remote tables and the on-device key/value store.

pub mod local;
pub mod postgrest;

pub use local::LocalStore;
pub use postgrest::TableClient;

/// Table names as constants.
pub mod tables {
    pub const TASKS: &str = "tasks";
    pub const PROFILES: &str = "profiles";
}

/// Local store keys as constants.
pub mod keys {
    pub const SESSION: &str = "session";
    pub const PROFILE_NAME: &str = "profile_name";
    pub const PROFILE_EMAIL: &str = "profile_email";
    pub const AVATAR_URL: &str = "avatar_url";
    pub const NOTIFICATIONS_ENABLED: &str = "notifications_enabled";
}
