// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile service: fetch, wholesale upsert, avatar upload.

use crate::db::postgrest::eq;
use crate::db::{keys, tables, LocalStore, TableClient};
use crate::error::AppError;
use crate::models::{AuthUser, Profile, ProfileUpdate};
use crate::notify::Notifier;
use crate::services::storage::{image_content_type, StorageClient, AVATARS_BUCKET};
use crate::time_utils::now_rfc3339;
use std::sync::Arc;
use validator::Validate;

/// Remote-backed profile access with local field caching.
#[derive(Clone)]
pub struct ProfileService {
    db: TableClient,
    storage: StorageClient,
    local: Arc<LocalStore>,
    notifier: Notifier,
}

impl ProfileService {
    pub fn new(
        db: TableClient,
        storage: StorageClient,
        local: Arc<LocalStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            db,
            storage,
            local,
            notifier,
        }
    }

    /// Fetch the user's profile row. A missing row is `None`, not an error.
    pub async fn profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        let row = self.reported(
            "fetch_profile",
            self.db
                .maybe_single::<Profile>(tables::PROFILES, "*", &[eq("id", user_id)])
                .await,
        )?;

        if let Some(profile) = &row {
            self.cache_fields(profile);
        }
        Ok(row)
    }

    /// Save the profile wholesale with a fresh `updated_at`.
    ///
    /// The email is duplicated from the auth record, never edited directly.
    pub async fn update_profile(
        &self,
        user: &AuthUser,
        update: ProfileUpdate,
    ) -> Result<Profile, AppError> {
        update.validate()?;

        let profile = Profile {
            id: user.id.clone(),
            username: update.username,
            email: user.email.clone(),
            avatar_url: update.avatar_url,
            website: update.website,
            updated_at: Some(now_rfc3339()),
        };

        let stored = self.reported(
            "update_profile",
            self.db.upsert::<Profile, _>(tables::PROFILES, &profile).await,
        )?;

        self.cache_fields(&stored);
        tracing::info!(user_id = %user.id, "Profile saved");
        Ok(stored)
    }

    /// Upload a new avatar image and return its public URL.
    ///
    /// Superseded images are left in the bucket. The caller is expected to
    /// follow up with [`update_profile`] carrying the returned URL.
    ///
    /// [`update_profile`]: ProfileService::update_profile
    pub async fn upload_avatar(&self, bytes: Vec<u8>, extension: &str) -> Result<String, AppError> {
        let extension = extension.trim_start_matches('.');
        let name = format!(
            "avatar-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            extension
        );

        self.reported(
            "upload_avatar",
            self.storage
                .upload(
                    AVATARS_BUCKET,
                    &name,
                    bytes,
                    image_content_type(extension),
                )
                .await,
        )?;

        let url = self.storage.public_url(AVATARS_BUCKET, &name);
        if let Err(e) = self.local.set(keys::AVATAR_URL, &url) {
            tracing::warn!(error = %e, "Failed to cache avatar URL");
        }
        Ok(url)
    }

    /// Mirror display fields into the device cache.
    fn cache_fields(&self, profile: &Profile) {
        let pairs = [
            (keys::PROFILE_NAME, profile.username.as_deref()),
            (keys::PROFILE_EMAIL, profile.email.as_deref()),
            (keys::AVATAR_URL, profile.avatar_url.as_deref()),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                if let Err(e) = self.local.set(key, value) {
                    tracing::warn!(key, error = %e, "Failed to cache profile field");
                }
            }
        }
    }

    fn reported<T>(
        &self,
        operation: &'static str,
        result: Result<T, AppError>,
    ) -> Result<T, AppError> {
        if let Err(e) = &result {
            self.notifier.report(operation, e);
        }
        result
    }
}
