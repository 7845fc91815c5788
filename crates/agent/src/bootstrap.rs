// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide agent lifecycle.
//!
//! One agent per worker process: subscriber, settings store, publisher, and
//! reporter assembled once behind a mutex. `start` is idempotent (the first
//! caller's configuration wins); `stop` tears the components down in reverse
//! data-flow order.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::AgentConfig;
use crate::publisher::{MetricSink, MetricsPublisher};
use crate::reporter::WorkerReporter;
use crate::settings::SettingsStore;
use crate::subscriber::SettingsSubscriber;

static AGENT: Mutex<Option<Arc<Agent>>> = Mutex::new(None);

/// A fully assembled agent instance.
pub struct Agent {
    config: AgentConfig,
    settings: Arc<SettingsStore>,
    subscriber: SettingsSubscriber,
    publisher: Arc<MetricsPublisher>,
    reporter: WorkerReporter,
}

impl Agent {
    /// Assemble and start a standalone agent. Most callers want the
    /// process-wide [`start`] instead. Must run inside a tokio runtime.
    pub fn assemble(config: AgentConfig) -> Arc<Self> {
        let settings = Arc::new(SettingsStore::new());

        let handler_store = Arc::clone(&settings);
        let subscriber = SettingsSubscriber::new(config.control_endpoint.clone(), move |packet| {
            handler_store.update(&packet)
        });
        subscriber.start();

        let publisher = Arc::new(MetricsPublisher::new(config.metrics_endpoint.clone()));

        let reporter = WorkerReporter::new(
            config.interval,
            Arc::clone(&settings),
            Arc::clone(&publisher) as Arc<dyn MetricSink>,
        );
        reporter.start();

        debug!(
            "agent started (metrics {}, control {})",
            config.metrics_endpoint, config.control_endpoint
        );
        Arc::new(Self { config, settings, subscriber, publisher, reporter })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    /// The sink requests are measured into.
    pub fn sink(&self) -> Arc<dyn MetricSink> {
        Arc::clone(&self.publisher) as Arc<dyn MetricSink>
    }

    /// Stop reporter, subscriber, then publisher, each with bounded waits.
    pub async fn shutdown(&self) {
        self.reporter.stop().await;
        self.subscriber.stop().await;
        self.publisher.close().await;
        debug!("agent stopped");
    }
}

/// Start the process-wide agent, or return the already-running one.
pub fn start(config: Option<AgentConfig>) -> Arc<Agent> {
    let mut guard = AGENT.lock();
    if let Some(agent) = guard.as_ref() {
        debug!("agent already running");
        return Arc::clone(agent);
    }
    let agent = Agent::assemble(config.unwrap_or_default());
    *guard = Some(Arc::clone(&agent));
    agent
}

/// Stop and discard the process-wide agent. A no-op when not running.
pub async fn stop() {
    let agent = AGENT.lock().take();
    if let Some(agent) = agent {
        agent.shutdown().await;
    }
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
