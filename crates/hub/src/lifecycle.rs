// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hub lifecycle: assembles every component and starts/stops them in a
//! deterministic order, with pid-file single-instance protection and
//! startup/shutdown hooks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use dashcorn_core::{Clock, SystemClock};
use dashcorn_wire::{Endpoint, EndpointError};

use crate::collector::MetricsCollector;
use crate::config::HubConfig;
use crate::control::ControlPublisher;
use crate::exporter::{ExportScheduler, MetricsExporter};
use crate::http::ExpositionServer;
use crate::pidfile::PidFile;
use crate::selector::LeaderSelector;
use crate::state::{RealtimeState, StateConfig};
use crate::supervisor::{ProcessExecutor, ProcessManager, ProcessRegistry, RegistryError};

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("hub already running (pid file {} owned by a live process)", .0.display())]
    AlreadyRunning(PathBuf),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("HTTP bind failed: {0}")]
    Bind(#[from] std::io::Error),
}

/// Endpoints actually bound by [`HubService::start`].
#[derive(Debug, Clone)]
pub struct BoundEndpoints {
    pub metrics: Endpoint,
    pub control: Endpoint,
    pub supervisor: Endpoint,
    pub exposition: SocketAddr,
}

/// The assembled hub: supervisor, exposition, aggregation, ingestion, and
/// election, started in that order and stopped in reverse.
pub struct HubService<C: Clock = SystemClock> {
    config: HubConfig,
    state: Arc<RealtimeState<C>>,
    exporter: Arc<MetricsExporter<C>>,
    collector: MetricsCollector<C>,
    publisher: Arc<ControlPublisher>,
    selector: LeaderSelector<C>,
    scheduler: ExportScheduler<C>,
    exposition: ExpositionServer<C>,
    manager: ProcessManager<C>,
    pid_file: Option<PidFile>,
    on_startup: Vec<Hook>,
    on_shutdown: Vec<Hook>,
    bound: Mutex<Option<BoundEndpoints>>,
}

impl HubService<SystemClock> {
    pub fn new(config: HubConfig) -> Result<Self, LifecycleError> {
        Self::with_parts(config, ProcessRegistry::default_path(), SystemClock)
    }
}

impl<C: Clock> HubService<C> {
    pub fn with_parts(
        config: HubConfig,
        registry_path: PathBuf,
        clock: C,
    ) -> Result<Self, LifecycleError> {
        let state = Arc::new(RealtimeState::with_clock(StateConfig::default(), clock.clone()));
        let exporter = Arc::new(MetricsExporter::with_clock(
            Arc::clone(&state),
            &config.metric_prefix,
            clock.clone(),
        ));
        let registry = ProcessRegistry::load(registry_path)?;
        let executor = Arc::new(ProcessExecutor::with_parts(
            registry,
            Box::new(crate::supervisor::UvicornSpawner),
            clock.clone(),
        ));

        let collector = MetricsCollector::new(Arc::clone(&state));
        let publisher = Arc::new(ControlPublisher::new(config.publish_delay));
        let selector = LeaderSelector::new(
            config.leader_rotate_interval,
            Arc::clone(&state),
            Arc::clone(&publisher),
        );
        let scheduler = ExportScheduler::new(config.aggregate_interval, Arc::clone(&exporter));
        let exposition = ExpositionServer::new(Arc::clone(&exporter));
        let manager = ProcessManager::new(executor);

        Ok(Self {
            config,
            state,
            exporter,
            collector,
            publisher,
            selector,
            scheduler,
            exposition,
            manager,
            pid_file: None,
            on_startup: Vec::new(),
            on_shutdown: Vec::new(),
            bound: Mutex::new(None),
        })
    }

    /// Manage a pid file: refuse start when its owner is alive, write on
    /// start, delete on stop.
    pub fn self_managed(mut self, pid_file: PidFile) -> Self {
        self.pid_file = Some(pid_file);
        self
    }

    pub fn on_startup(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_startup.push(Box::new(hook));
        self
    }

    pub fn on_shutdown(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_shutdown.push(Box::new(hook));
        self
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<RealtimeState<C>> {
        &self.state
    }

    pub fn exporter(&self) -> &Arc<MetricsExporter<C>> {
        &self.exporter
    }

    pub fn bound_endpoints(&self) -> Option<BoundEndpoints> {
        self.bound.lock().clone()
    }

    /// Start every component. Fatal errors (pid conflict, bind or registry
    /// failure) abort startup.
    pub async fn start(&self) -> Result<BoundEndpoints, LifecycleError> {
        if let Some(pid_file) = &self.pid_file {
            if pid_file.is_alive() {
                return Err(LifecycleError::AlreadyRunning(pid_file.path().to_path_buf()));
            }
            pid_file.write()?;
        }

        for hook in &self.on_startup {
            hook();
        }

        let supervisor = self.manager.start(&self.config.pm_endpoint).await?;
        let exposition =
            self.exposition.start(&self.config.prom_host, self.config.prom_port).await?;
        self.scheduler.start();
        let metrics = self.collector.start(&self.config.metrics_endpoint).await?;
        let control = self.publisher.start(&self.config.control_endpoint).await?;
        self.selector.start();

        let bound = BoundEndpoints { metrics, control, supervisor, exposition };
        *self.bound.lock() = Some(bound.clone());
        info!(
            "hub started (metrics {}, control {}, supervisor {}, exposition {})",
            bound.metrics, bound.control, bound.supervisor, bound.exposition
        );
        Ok(bound)
    }

    /// Stop every component in reverse order, then run shutdown hooks and
    /// drop the pid file.
    pub async fn stop(&self) {
        self.selector.stop().await;
        self.publisher.close().await;
        self.collector.stop().await;
        self.scheduler.stop().await;
        self.exposition.stop().await;
        self.manager.stop().await;

        for hook in &self.on_shutdown {
            hook();
        }
        if let Some(pid_file) = &self.pid_file {
            pid_file.remove();
        }
        *self.bound.lock() = None;
        info!("hub stopped");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
