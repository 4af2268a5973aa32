// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod profile;
pub mod settings;
pub mod storage;
pub mod tasks;

pub use auth::{AuthClient, Credentials, OAuthProvider, PkceFlow};
pub use profile::ProfileService;
pub use settings::Settings;
pub use storage::StorageClient;
pub use tasks::{NotifyingTask, TaskStore};
