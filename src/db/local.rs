// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-device key/value persistence.
//!
//! A handful of string pairs (session snapshot, cached profile fields,
//! settings toggles) stored as one JSON object file. No schema versioning;
//! a missing or corrupt file starts empty.

use crate::error::AppError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Small persistent string key/value store.
pub struct LocalStore {
    path: PathBuf,
    map: Mutex<BTreeMap<String, String>>,
}

impl LocalStore {
    /// Open the store at `path`, loading existing contents if present.
    pub fn load(path: &Path) -> Self {
        let map = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Corrupt local store, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Self {
            path: path.to_path_buf(),
            map: Mutex::new(map),
        }
    }

    /// Read a value.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Write a value and persist the whole map.
    pub fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut map = self.lock();
        map.insert(key.to_string(), value.to_string());
        self.persist(&map)
    }

    /// Remove a value and persist.
    pub fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut map = self.lock();
        map.remove(key);
        self.persist(&map)
    }

    /// Drop everything (used on sign-out, mirroring a full device-cache
    /// clear).
    pub fn clear(&self) -> Result<(), AppError> {
        let mut map = self.lock();
        map.clear();
        self.persist(&map)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::LocalStore(e.to_string()))?;
            }
        }
        let raw = serde_json::to_string_pretty(map)
            .map_err(|e| AppError::LocalStore(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| AppError::LocalStore(e.to_string()))
    }
}
