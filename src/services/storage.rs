// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object storage client (avatar images).

use crate::config::Config;
use crate::error::AppError;
use crate::models::session::SharedSession;

/// Bucket holding profile avatars.
pub const AVATARS_BUCKET: &str = "avatars";

/// Client for the backend's object storage API.
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: SharedSession,
}

impl StorageClient {
    /// Create a new storage client sharing the app-wide session slot.
    pub fn new(config: &Config, session: SharedSession) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/storage/v1", config.backend_url),
            anon_key: config.anon_key.clone(),
            session,
        }
    }

    fn bearer(&self) -> String {
        self.session
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    /// Upload an object into a bucket.
    pub async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/object/{}/{}",
            self.base_url,
            bucket,
            urlencoding::encode(name)
        );

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!("HTTP {}: {}", status, body)));
        }

        tracing::debug!(bucket, name, "Object uploaded");
        Ok(())
    }

    /// Public URL for an object in a public bucket.
    pub fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.base_url,
            bucket,
            urlencoding::encode(name)
        )
    }
}

/// Content type for an image file extension.
pub fn image_content_type(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
