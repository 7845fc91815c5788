// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band process supervisor.
//!
//! A request/reply loop on a local IPC socket: one `{cmd, args}` request in,
//! one `{status, ...}` reply out. Handler failures become error replies and
//! never take the loop down.

mod executor;
mod registry;

pub use executor::{ProcessExecutor, Spawn, UvicornSpawner};
pub use registry::{ProcessRegistry, RegistryError};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashcorn_core::Clock;
use dashcorn_wire::{
    read_message, write_message, BoundListener, Conn, Endpoint, EndpointError, Reply, StartArgs,
};

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
const RESTART_PAUSE: Duration = Duration::from_millis(200);

struct Running {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
    bound: Endpoint,
}

/// Serves supervisor commands over the reply socket.
pub struct ProcessManager<C: Clock> {
    executor: Arc<ProcessExecutor<C>>,
    running: Mutex<Option<Running>>,
}

impl<C: Clock> ProcessManager<C> {
    pub fn new(executor: Arc<ProcessExecutor<C>>) -> Self {
        Self { executor, running: Mutex::new(None) }
    }

    /// Bind the reply socket (refreshing a stale IPC file) and serve.
    /// Returns the bound endpoint. A no-op when already running.
    pub async fn start(&self, endpoint: &Endpoint) -> Result<Endpoint, EndpointError> {
        {
            let running = self.running.lock();
            if let Some(running) = running.as_ref() {
                if !running.handle.is_finished() {
                    debug!("process manager already running");
                    return Ok(running.bound.clone());
                }
            }
        }

        let listener = endpoint.bind().await?;
        let bound = listener.local_endpoint().unwrap_or_else(|| endpoint.clone());
        debug!("process manager listening on {bound}");

        let cancel = CancellationToken::new();
        let executor = Arc::clone(&self.executor);
        let handle = tokio::spawn(serve_loop(listener, executor, cancel.clone()));
        *self.running.lock() = Some(Running { cancel, handle, bound: bound.clone() });
        Ok(bound)
    }

    /// Stop serving with a bounded join. A no-op when stopped.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return;
        };
        running.cancel.cancel();
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, running.handle).await.is_err() {
            warn!("process manager did not stop within {STOP_JOIN_TIMEOUT:?}");
        }
        debug!("process manager stopped");
    }

    pub async fn restart(&self, endpoint: &Endpoint) -> Result<Endpoint, EndpointError> {
        self.stop().await;
        tokio::time::sleep(RESTART_PAUSE).await;
        self.start(endpoint).await
    }
}

async fn serve_loop<C: Clock>(
    listener: BoundListener,
    executor: Arc<ProcessExecutor<C>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok(conn) => {
                    let executor = Arc::clone(&executor);
                    let cancel = cancel.clone();
                    tokio::spawn(handle_conn(conn, executor, cancel));
                }
                Err(err) => {
                    warn!("accept error on supervisor socket: {err}");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            },
        }
    }
}

async fn handle_conn<C: Clock>(
    mut conn: Conn,
    executor: Arc<ProcessExecutor<C>>,
    cancel: CancellationToken,
) {
    loop {
        let payload = tokio::select! {
            _ = cancel.cancelled() => return,
            result = read_message(&mut conn) => match result {
                Ok(payload) => payload,
                Err(err) if err.is_closed() => return,
                Err(err) => {
                    warn!("supervisor receive error: {err}");
                    return;
                }
            },
        };

        // Handlers block (signal delivery, restart pauses), so they run off
        // the runtime.
        let handler_executor = Arc::clone(&executor);
        let reply = tokio::task::spawn_blocking(move || {
            dispatch_request(handler_executor.as_ref(), &payload)
        })
        .await
        .unwrap_or_else(|err| Reply::error(format!("handler failed: {err}")));

        let encoded = match dashcorn_wire::encode(&reply) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!("failed to encode supervisor reply: {err}");
                continue;
            }
        };
        if let Err(err) = write_message(&mut conn, &encoded).await {
            warn!("failed to send supervisor reply: {err}");
            return;
        }
    }
}

/// Decode one `{cmd, args}` request and run the matching handler.
pub(crate) fn dispatch_request<C: Clock>(executor: &ProcessExecutor<C>, payload: &[u8]) -> Reply {
    let value: serde_json::Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(err) => return Reply::error(format!("malformed request: {err}")),
    };
    let Some(cmd) = value.get("cmd").and_then(serde_json::Value::as_str) else {
        return Reply::error("missing command");
    };
    let args = value.get("args").cloned().unwrap_or_else(|| serde_json::json!({}));

    match cmd {
        "start" => match serde_json::from_value::<StartArgs>(args) {
            Ok(start_args) => executor.start(&start_args),
            Err(err) => Reply::error(format!("bad arguments for start: {err}")),
        },
        "stop" => match named(args) {
            Ok(name) => executor.stop(&name),
            Err(reply) => reply,
        },
        "restart" => match named(args) {
            Ok(name) => executor.restart(&name),
            Err(reply) => reply,
        },
        "list" => executor.list(),
        "delete" => match named(args) {
            Ok(name) => executor.delete(&name),
            Err(reply) => reply,
        },
        other => Reply::error(format!("Unknown command: {other}")),
    }
}

fn named(args: serde_json::Value) -> Result<String, Reply> {
    match args.get("name").and_then(serde_json::Value::as_str) {
        Some(name) => Ok(name.to_string()),
        None => Err(Reply::error("missing 'name' argument")),
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
