// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command handlers behind the supervisor socket.
//!
//! Every handler returns a structured [`Reply`]; nothing here panics or
//! propagates into the serve loop. Spawning goes through the [`Spawn`] seam
//! so tests can substitute a recorder.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use tracing::{debug, warn};

use dashcorn_core::{pid_exists, Clock, SystemClock};
use dashcorn_wire::{ProcRecord, ProcessEntry, Reply, ReplyStatus, RunStatus, StartArgs};

use super::registry::ProcessRegistry;

/// Pause between stop and start during a restart, giving the old listener
/// time to release its port.
const RESTART_PAUSE: Duration = Duration::from_secs(1);

/// Seam for launching detached children.
pub trait Spawn: Send + Sync {
    fn spawn(
        &self,
        argv: &[String],
        env: &[(String, String)],
        cwd: Option<&Path>,
    ) -> std::io::Result<u32>;
}

/// Launches the argv as a detached child with null stdio.
pub struct UvicornSpawner;

impl Spawn for UvicornSpawner {
    fn spawn(
        &self,
        argv: &[String],
        env: &[(String, String)],
        cwd: Option<&Path>,
    ) -> std::io::Result<u32> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv")
        })?;
        let mut command = std::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for (key, value) in env {
            command.env(key, value);
        }
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        let child = command.spawn()?;
        Ok(child.id())
    }
}

/// The supervisor's state: registry plus spawner.
pub struct ProcessExecutor<C: Clock = SystemClock> {
    registry: Mutex<ProcessRegistry>,
    spawner: Box<dyn Spawn>,
    clock: C,
}

impl ProcessExecutor<SystemClock> {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self::with_parts(registry, Box::new(UvicornSpawner), SystemClock)
    }
}

impl<C: Clock> ProcessExecutor<C> {
    pub fn with_parts(registry: ProcessRegistry, spawner: Box<dyn Spawn>, clock: C) -> Self {
        Self { registry: Mutex::new(registry), spawner, clock }
    }

    pub fn start(&self, args: &StartArgs) -> Reply {
        if matches!(args.workers, Some(0)) {
            return Reply::error("workers must be positive");
        }

        let mut registry = self.registry.lock();
        if registry.contains(&args.name) {
            return Reply::with_status(ReplyStatus::AlreadyExists);
        }

        let argv = uvicorn_argv(args);
        let mut env = Vec::new();
        if let Some(python_path) = &args.python_path {
            env.push(("PYTHONPATH".to_string(), python_path.clone()));
        }
        debug!("starting process '{}': {argv:?}", args.name);

        match self.spawner.spawn(&argv, &env, args.cwd.as_deref().map(Path::new)) {
            Ok(pid) => {
                let record = ProcRecord {
                    pid,
                    app_path: args.app_path.clone(),
                    start_time: self.clock.epoch_secs(),
                };
                registry.insert(args.name.clone(), record.clone());
                persist(&registry);
                Reply::ok().proc_record(record)
            }
            Err(err) => Reply::error(format!("failed to start '{}': {err}", args.name)),
        }
    }

    pub fn stop(&self, name: &str) -> Reply {
        let mut registry = self.registry.lock();
        let Some(record) = registry.get(name).cloned() else {
            return Reply::with_status(ReplyStatus::NotFound);
        };

        // A pid that does not fit i32 cannot name a live process; a blind
        // cast would turn it into a process-group kill.
        let reply = match i32::try_from(record.pid) {
            Ok(pid) => match kill(Pid::from_raw(pid), Signal::SIGTERM) {
                Ok(()) => Reply::ok().pid(record.pid),
                Err(nix::errno::Errno::ESRCH) => {
                    Reply::with_status(ReplyStatus::AlreadyStopped).pid(record.pid)
                }
                Err(err) => {
                    Reply::error(format!("failed to stop '{name}': {err}")).pid(record.pid)
                }
            },
            Err(_) => Reply::with_status(ReplyStatus::AlreadyStopped).pid(record.pid),
        };
        // The entry is forgotten whatever the signal outcome.
        registry.remove(name);
        persist(&registry);
        reply
    }

    pub fn restart(&self, name: &str) -> Reply {
        let app_path = {
            let registry = self.registry.lock();
            match registry.get(name) {
                Some(record) => record.app_path.clone(),
                None => return Reply::with_status(ReplyStatus::NotFound),
            }
        };
        self.stop(name);
        std::thread::sleep(RESTART_PAUSE);
        let started = self.start(&StartArgs::new(name, app_path));
        match started.status {
            ReplyStatus::Ok => Reply::ok(),
            _ => started,
        }
    }

    pub fn list(&self) -> Reply {
        let registry = self.registry.lock();
        let processes = registry
            .iter()
            .map(|(name, record)| ProcessEntry {
                name: name.clone(),
                pid: record.pid,
                status: if pid_exists(record.pid) {
                    RunStatus::Running
                } else {
                    RunStatus::Crashed
                },
                app_path: Some(record.app_path.clone()),
            })
            .collect();
        Reply::ok().processes(processes)
    }

    pub fn delete(&self, name: &str) -> Reply {
        let mut registry = self.registry.lock();
        if registry.remove(name).is_none() {
            return Reply::with_status(ReplyStatus::NotFound);
        }
        persist(&registry);
        Reply::ok()
    }
}

fn persist(registry: &ProcessRegistry) {
    if let Err(err) = registry.save() {
        warn!("failed to persist process registry: {err}");
    }
}

/// Module-form uvicorn argv: `python3 -m uvicorn pkg.app:app [flags]`.
pub(crate) fn uvicorn_argv(args: &StartArgs) -> Vec<String> {
    let module = args.app_path.replace('/', ".");
    let module = module.strip_suffix(".py").unwrap_or(&module);

    let mut argv = vec![
        "python3".to_string(),
        "-m".to_string(),
        "uvicorn".to_string(),
        format!("{module}:{}", args.app_object),
    ];
    if let Some(host) = &args.host {
        argv.push("--host".to_string());
        argv.push(host.clone());
    }
    if let Some(port) = args.port {
        argv.push("--port".to_string());
        argv.push(port.to_string());
    }
    if let Some(workers) = args.workers {
        argv.push("--workers".to_string());
        argv.push(workers.to_string());
    }
    argv
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
