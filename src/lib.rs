// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Taskdeck: client library for a hosted to-do backend.
//!
//! This crate provides the shared state layer a to-do app's screens consume:
//! the session gate, the task store, and profile/storage access, all backed
//! by a Supabase-style hosted backend (GoTrue auth, PostgREST tables, object
//! storage).

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod session;
pub mod time_utils;

use config::Config;
use db::{LocalStore, TableClient};
use models::session::SharedSession;
use notify::{Notice, Notifier};
use services::{AuthClient, ProfileService, Settings, StorageClient, TaskStore};
use session::SessionGate;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Root application state.
///
/// Owned by the embedding app's root; screens receive handles (every service
/// is cheaply cloneable) and act as consumers plus dispatchers of intent.
pub struct App {
    pub config: Config,
    pub local: Arc<LocalStore>,
    pub auth: AuthClient,
    pub tasks: TaskStore,
    pub profile: ProfileService,
    pub settings: Settings,
    pub gate: SessionGate,
    notifier: Notifier,
}

impl App {
    /// Wire up the full client.
    ///
    /// Must be called within a Tokio runtime: the session gate and the token
    /// auto-refresh loop run as background tasks.
    pub fn new(config: Config) -> Self {
        let local = Arc::new(LocalStore::load(&config.local_store_path));
        let session = SharedSession::default();
        let notifier = Notifier::new();

        let auth = AuthClient::new(&config, local.clone(), session.clone());
        auth.spawn_auto_refresh();

        let db = TableClient::new(&config, session.clone());
        let storage = StorageClient::new(&config, session);

        let tasks = TaskStore::new(db.clone(), notifier.clone());
        let profile = ProfileService::new(db, storage, local.clone(), notifier.clone());
        let settings = Settings::new(local.clone());

        let gate = SessionGate::spawn(auth.clone(), config.splash_min);

        Self {
            config,
            local,
            auth,
            tasks,
            profile,
            settings,
            gate,
            notifier,
        }
    }

    /// Subscribe to user-visible notices about failed remote operations.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }
}

/// Initialize structured JSON logging.
pub fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("taskdeck=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
