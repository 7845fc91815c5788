// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hub pid file: decimal ASCII under the dashcorn config directory.

use std::path::{Path, PathBuf};

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::debug;

use crate::config::config_dir;

pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// `~/.config/dashcorn/hub.pid`
    pub fn default_path() -> PathBuf {
        config_dir().join("hub.pid")
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The recorded pid, if the file exists and parses.
    pub fn read(&self) -> Option<u32> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        raw.trim().parse().ok()
    }

    /// Whether the recorded owner process is alive right now (signal 0).
    pub fn is_alive(&self) -> bool {
        let Some(pid) = self.read() else {
            return false;
        };
        let Ok(pid) = i32::try_from(pid) else {
            return false;
        };
        kill(Pid::from_raw(pid), None).is_ok()
    }

    /// Record the current process id.
    pub fn write(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, std::process::id().to_string())?;
        debug!("pid written to {}", self.path.display());
        Ok(())
    }

    /// Delete the pid file. Missing files are fine.
    pub fn remove(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("pid file {} removed", self.path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => debug!("could not remove pid file {}: {err}", self.path.display()),
        }
    }
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
