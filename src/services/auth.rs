// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth client for the hosted backend's GoTrue-style API.
//!
//! Handles:
//! - Email/password sign-up and sign-in
//! - OAuth provider-redirect flow with PKCE
//! - Session persistence and restore across restarts
//! - Automatic token refresh ahead of expiry
//! - Auth state change notifications
//! - Password-reset email requests

use crate::config::Config;
use crate::db::{keys, LocalStore};
use crate::error::AppError;
use crate::models::session::SharedSession;
use crate::models::{AuthUser, Session};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use validator::{Validate, ValidateEmail};

/// Margin before token expiration when we proactively refresh.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Delay before retrying a failed background refresh.
const REFRESH_RETRY_SECS: u64 = 30;

/// Email/password credentials, validated before any network call.
#[derive(Debug, Validate)]
pub struct Credentials {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// OAuth providers offered on the login screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Facebook => "facebook",
        }
    }
}

/// In-flight PKCE state for one provider-redirect round trip.
///
/// The verifier never leaves the client; only its S256 challenge is sent in
/// the authorize URL.
#[derive(Debug, Clone)]
pub struct PkceFlow {
    pub state: String,
    verifier: String,
}

/// Client for the backend auth API.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    redirect_url: String,
    session: SharedSession,
    local: Arc<LocalStore>,
    /// Serializes token refresh so concurrent callers trigger one refresh.
    refresh_lock: Arc<Mutex<()>>,
    state_tx: Arc<watch::Sender<Option<AuthUser>>>,
}

impl AuthClient {
    /// Create a new auth client sharing the app-wide session slot.
    pub fn new(config: &Config, local: Arc<LocalStore>, session: SharedSession) -> Self {
        let (state_tx, _state_rx) = watch::channel(None);
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/auth/v1", config.backend_url),
            anon_key: config.anon_key.clone(),
            redirect_url: config.oauth_redirect_url.clone(),
            session,
            local,
            refresh_lock: Arc::new(Mutex::new(())),
            state_tx: Arc::new(state_tx),
        }
    }

    // ─── Session Access ──────────────────────────────────────────────────

    /// The current session, if any.
    pub fn current_session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The currently signed-in user, if any.
    pub fn current_user(&self) -> Option<AuthUser> {
        self.current_session().map(|s| s.user)
    }

    /// Observe auth state changes: `Some(user)` after sign-in or token
    /// refresh, `None` after sign-out.
    pub fn on_auth_state_change(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state_tx.subscribe()
    }

    // ─── Sign-in / Sign-up ───────────────────────────────────────────────

    /// Sign in with email and password.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthUser, AppError> {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
        .validate()?;

        let token = self
            .token_request(
                "password",
                &serde_json::json!({ "email": email, "password": password }),
            )
            .await?;

        let session = self.install_token_response(token)?;
        tracing::info!(user_id = %session.user.id, "Signed in with password");
        Ok(session.user)
    }

    /// Register a new account, then sign in with the same credentials.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AppError> {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
        .validate()?;

        let response = self
            .http
            .post(format!("{}/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        check_auth_response(response).await?;

        // Auto login after signup
        self.sign_in_with_password(email, password).await
    }

    /// Sign out. The backend call is best-effort; local state is always
    /// cleared and the device cache dropped wholesale.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        if let Some(session) = self.current_session() {
            let result = self
                .http
                .post(format!("{}/logout", self.base_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await;

            match result {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(status = %response.status(), "Sign-out rejected by backend");
                }
                Err(e) => tracing::warn!(error = %e, "Sign-out request failed"),
                _ => {}
            }
        }

        *self
            .session
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        self.local.clear()?;
        self.state_tx.send_replace(None);
        tracing::info!("Signed out");
        Ok(())
    }

    /// Request a password-reset email.
    pub async fn reset_password_email(&self, email: &str) -> Result<(), AppError> {
        if !email.validate_email() {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }

        let response = self
            .http
            .post(format!("{}/recover", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        check_auth_response(response).await?;
        tracing::info!("Password reset email requested");
        Ok(())
    }

    // ─── OAuth (provider redirect with PKCE) ─────────────────────────────

    /// Build the provider authorize URL and the matching in-flight PKCE
    /// state. The caller opens the URL in a browser and later passes the
    /// callback's `state` and `code` to [`exchange_code`].
    ///
    /// [`exchange_code`]: AuthClient::exchange_code
    pub fn authorize_url(&self, provider: OAuthProvider) -> Result<(String, PkceFlow), AppError> {
        let rng = SystemRandom::new();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG failure")))?;
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG failure")))?;
        let state = hex::encode(state_bytes);

        let url = format!(
            "{}/authorize?provider={}&redirect_to={}&code_challenge={}&code_challenge_method=s256&state={}",
            self.base_url,
            provider.as_str(),
            urlencoding::encode(&self.redirect_url),
            pkce_challenge(&verifier),
            state,
        );

        Ok((url, PkceFlow { state, verifier }))
    }

    /// Exchange the OAuth callback code for a session.
    pub async fn exchange_code(
        &self,
        flow: &PkceFlow,
        returned_state: &str,
        code: &str,
    ) -> Result<AuthUser, AppError> {
        if returned_state != flow.state {
            tracing::error!("OAuth state mismatch, possible tampering");
            return Err(AppError::Auth("OAuth state mismatch".to_string()));
        }

        let token = self
            .token_request(
                "pkce",
                &serde_json::json!({ "auth_code": code, "code_verifier": &flow.verifier }),
            )
            .await?;

        let session = self.install_token_response(token)?;
        tracing::info!(user_id = %session.user.id, "Signed in via OAuth");
        Ok(session.user)
    }

    // ─── Restore / Refresh ───────────────────────────────────────────────

    /// Restore a persisted session, refreshing it when expired.
    ///
    /// Returns `Ok(None)` when no usable session is persisted; a failed
    /// refresh of an expired session is an error so the gate can log it.
    pub async fn restore_session(&self) -> Result<Option<AuthUser>, AppError> {
        let Some(raw) = self.local.get(keys::SESSION) else {
            return Ok(None);
        };

        let mut session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                // The snapshot has no schema version; anything unreadable is
                // discarded rather than migrated.
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                self.local.remove(keys::SESSION)?;
                return Ok(None);
            }
        };

        // The token's own exp claim wins over the persisted timestamp.
        if let Some(expiry) = token_expiry(&session.access_token) {
            session.expires_at = expiry;
        }

        if session.expires_within(Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)) {
            tracing::info!("Persisted session expired, refreshing");
            let token = self
                .token_request(
                    "refresh_token",
                    &serde_json::json!({ "refresh_token": &session.refresh_token }),
                )
                .await?;
            let session = self.install_token_response(token)?;
            return Ok(Some(session.user));
        }

        let user = session.user.clone();
        self.install_session(session)?;
        Ok(Some(user))
    }

    /// Get a valid (non-expired) access token, refreshing if needed.
    ///
    /// Fast path reads the cached session; the refresh path is serialized
    /// behind a lock and re-checks after acquiring it, so concurrent callers
    /// trigger a single refresh.
    pub async fn ensure_valid_access_token(&self) -> Result<String, AppError> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        match self.current_session() {
            None => return Err(AppError::Unauthorized),
            Some(session) if !session.expires_within(margin) => {
                return Ok(session.access_token);
            }
            Some(_) => {}
        }

        let _guard = self.refresh_lock.lock().await;

        // Re-check after acquiring the lock; another task may have refreshed.
        let refresh_token = match self.current_session() {
            None => return Err(AppError::Unauthorized),
            Some(session) if !session.expires_within(margin) => {
                return Ok(session.access_token);
            }
            Some(session) => session.refresh_token,
        };

        tracing::info!("Access token expired, refreshing");
        let token = self
            .token_request(
                "refresh_token",
                &serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await?;

        let session = self.install_token_response(token)?;
        Ok(session.access_token)
    }

    /// Background task that keeps the session fresh, refreshing ahead of
    /// expiry for as long as a session exists.
    pub fn spawn_auto_refresh(&self) {
        let auth = self.clone();
        tokio::spawn(async move {
            let mut changes = auth.on_auth_state_change();
            loop {
                let wake_in = auth.current_session().map(|session| {
                    (session.expires_at
                        - Utc::now()
                        - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS))
                    .to_std()
                    .unwrap_or_default()
                });

                match wake_in {
                    // Signed out: wait for the next auth state change.
                    None => {
                        if changes.changed().await.is_err() {
                            break;
                        }
                    }
                    Some(wake_in) => {
                        tokio::select! {
                            _ = tokio::time::sleep(wake_in) => {
                                if let Err(e) = auth.ensure_valid_access_token().await {
                                    tracing::warn!(error = %e, "Background token refresh failed");
                                    tokio::time::sleep(std::time::Duration::from_secs(
                                        REFRESH_RETRY_SECS,
                                    ))
                                    .await;
                                }
                            }
                            changed = changes.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        });
    }

    // ─── Internal helpers ────────────────────────────────────────────────

    async fn token_request(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        check_auth_response_json(response).await
    }

    fn install_token_response(&self, token: TokenResponse) -> Result<Session, AppError> {
        let session = Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
            user: token.user,
        };
        self.install_session(session.clone())?;
        Ok(session)
    }

    fn install_session(&self, session: Session) -> Result<(), AppError> {
        let raw = serde_json::to_string(&session)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("session encode failed: {e}")))?;
        let user = session.user.clone();

        *self
            .session
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(session);
        self.local.set(keys::SESSION, &raw)?;
        self.state_tx.send_replace(Some(user));
        Ok(())
    }
}

/// Compute the S256 PKCE challenge for a verifier.
fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Recover the expiry claim from an access token.
///
/// The client holds no signing secret, so the signature is deliberately not
/// validated; the token is only trusted as far as scheduling a refresh.
fn token_expiry(access_token: &str) -> Option<DateTime<Utc>> {
    #[derive(Deserialize)]
    struct ExpClaim {
        exp: i64,
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data =
        decode::<ExpClaim>(access_token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    DateTime::from_timestamp(data.claims.exp, 0)
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: AuthUser,
}

/// Error body returned by the auth API.
#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Check response status, mapping auth API error bodies to readable messages.
async fn check_auth_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AuthErrorBody>(&body)
        .ok()
        .and_then(|e| e.error_description.or(e.msg).or(e.error))
        .unwrap_or_else(|| format!("HTTP {}", status));

    if status.is_client_error() {
        Err(AppError::Auth(message))
    } else {
        Err(AppError::Api(format!("HTTP {}: {}", status, message)))
    }
}

/// Check response and parse JSON body.
async fn check_auth_response_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let response = check_auth_response(response).await?;
    response
        .json()
        .await
        .map_err(|e| AppError::Auth(format!("JSON parse error: {}", e)))
}
