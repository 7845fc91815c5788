// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted registry of supervised processes.
//!
//! A pretty-printed JSON object keyed by process name, written through on
//! every mutation so a restarted hub keeps supervising.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

use dashcorn_wire::ProcRecord;

use crate::config::config_dir;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("I/O error on {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("corrupt registry {0}: {1}")]
    Corrupt(PathBuf, serde_json::Error),
}

/// Name → record mapping backed by a JSON file.
#[derive(Debug)]
pub struct ProcessRegistry {
    path: PathBuf,
    entries: IndexMap<String, ProcRecord>,
}

impl ProcessRegistry {
    /// `~/.config/dashcorn/running.json`
    pub fn default_path() -> PathBuf {
        config_dir().join("running.json")
    }

    /// Load the registry, starting empty when the file does not exist.
    pub fn load(path: PathBuf) -> Result<Self, RegistryError> {
        if !path.exists() {
            return Ok(Self { path, entries: IndexMap::new() });
        }
        let raw = std::fs::read(&path).map_err(|err| RegistryError::Io(path.clone(), err))?;
        let entries = serde_json::from_slice(&raw)
            .map_err(|err| RegistryError::Corrupt(path.clone(), err))?;
        Ok(Self { path, entries })
    }

    /// Write the registry through to disk.
    pub fn save(&self) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| RegistryError::Io(self.path.clone(), err))?;
        }
        let pretty = serde_json::to_vec_pretty(&self.entries)
            .map_err(|err| RegistryError::Corrupt(self.path.clone(), err))?;
        std::fs::write(&self.path, pretty).map_err(|err| RegistryError::Io(self.path.clone(), err))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ProcRecord> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: String, record: ProcRecord) {
        self.entries.insert(name, record);
    }

    pub fn remove(&mut self, name: &str) -> Option<ProcRecord> {
        self.entries.shift_remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProcRecord)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
