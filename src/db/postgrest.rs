// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed wrapper over the backend's PostgREST-style table API.
//!
//! Provides row-level operations with column `eq` filters:
//! - Select (optionally restricted to named columns)
//! - Insert and update with `return=representation`
//! - Wholesale upsert (`resolution=merge-duplicates`)
//! - Delete
//!
//! Every request carries the project anon key; the user's bearer token is
//! attached when a session exists, otherwise the anon key doubles as bearer.
//! No request timeout is set beyond the HTTP client default.

use crate::config::Config;
use crate::error::AppError;
use crate::models::session::SharedSession;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Build an `eq` filter pair for a select/update/delete call.
pub fn eq(column: &str, value: impl ToString) -> (String, String) {
    (column.to_string(), format!("eq.{}", value.to_string()))
}

/// Client for the remote table API.
#[derive(Clone)]
pub struct TableClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: SharedSession,
}

impl TableClient {
    /// Create a new table client sharing the app-wide session slot.
    pub fn new(config: &Config, session: SharedSession) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/rest/v1", config.backend_url),
            anon_key: config.anon_key.clone(),
            session,
        }
    }

    /// Bearer token for the current request: the session's access token, or
    /// the anon key when signed out.
    fn bearer(&self) -> String {
        self.session
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Select all rows, optionally constrained by `eq` filters.
    ///
    /// Server-provided ordering is preserved; no client-side sort.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<T>, AppError> {
        self.select_columns(table, "*", filters).await
    }

    /// Select named columns only (e.g. `"id,text"`).
    pub async fn select_columns<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .request(Method::GET, table)
            .query(&[("select", columns)])
            .query(filters)
            .send()
            .await
            .map_err(|e| AppError::Api(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Select exactly one row, tolerating absence.
    ///
    /// Uses the single-object representation; the backend answers 406 when
    /// no row matches, which maps to `None`.
    pub async fn maybe_single<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(String, String)],
    ) -> Result<Option<T>, AppError> {
        let response = self
            .request(Method::GET, table)
            .header(
                ACCEPT,
                HeaderValue::from_static("application/vnd.pgrst.object+json"),
            )
            .query(&[("select", columns)])
            .query(filters)
            .send()
            .await
            .map_err(|e| AppError::Api(e.to_string()))?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Ok(None);
        }

        self.check_response_json(response).await.map(Some)
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Insert one row and return the stored representation.
    pub async fn insert<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Api(e.to_string()))?;

        let mut rows: Vec<T> = self.check_response_json(response).await?;
        rows.pop()
            .ok_or_else(|| AppError::Api("insert returned no representation".to_string()))
    }

    /// Update rows matching the filters and return their representations.
    pub async fn update<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        filters: &[(String, String)],
        patch: &B,
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(filters)
            .json(patch)
            .send()
            .await
            .map_err(|e| AppError::Api(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Upsert one row wholesale (insert-or-merge on the primary key).
    pub async fn upsert<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Api(e.to_string()))?;

        let mut rows: Vec<T> = self.check_response_json(response).await?;
        rows.pop()
            .ok_or_else(|| AppError::Api("upsert returned no representation".to_string()))
    }

    /// Delete rows matching the filters.
    pub async fn delete(&self, table: &str, filters: &[(String, String)]) -> Result<(), AppError> {
        let response = self
            .request(Method::DELETE, table)
            .query(filters)
            .send()
            .await
            .map_err(|e| AppError::Api(e.to_string()))?;

        self.check_response(response).await
    }

    // ─── Response handling ───────────────────────────────────────

    /// Check response status and return an error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized);
        }

        Err(AppError::Api(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status == StatusCode::UNAUTHORIZED {
                return Err(AppError::Unauthorized);
            }

            return Err(AppError::Api(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Api(format!("JSON parse error: {}", e)))
    }
}
