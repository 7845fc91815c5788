// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dashcornd: the hub daemon.
//!
//! Starts the hub service (supervisor, exposition, aggregation, ingestion,
//! election), serves the JSON API, and shuts everything down on SIGTERM or
//! SIGINT.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dashcorn_hub::config::config_dir;
use dashcorn_hub::{HubApiServer, HubConfig, HubService, PidFile};

fn init_logging(enable_debug: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_level = if enable_debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dashcorn_hub={default_level},info")));

    let log_dir = config_dir();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let appender = tracing_appender::rolling::never(log_dir, "hub.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
        Some(guard)
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        None
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = HubConfig::from_env();
    let _log_guard = init_logging(config.enable_logging);

    let service = match HubService::new(config.clone()) {
        Ok(service) => service.self_managed(PidFile::new(PidFile::default_path())),
        Err(err) => {
            error!("failed to assemble hub: {err}");
            eprintln!("dashcornd: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = service.start().await {
        error!("failed to start hub: {err}");
        eprintln!("dashcornd: {err}");
        return ExitCode::FAILURE;
    }

    let api = HubApiServer::new(std::sync::Arc::clone(service.state()));
    match api.start(&config.hub_host, config.hub_port).await {
        Ok(addr) => info!("JSON API listening on {addr}"),
        Err(err) => {
            error!("failed to bind JSON API: {err}");
            eprintln!("dashcornd: {err}");
            service.stop().await;
            return ExitCode::FAILURE;
        }
    }
    println!("dashcornd running (api http://{}:{})", config.hub_host, config.hub_port);

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");

    api.stop().await;
    service.stop().await;
    ExitCode::SUCCESS
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            error!("failed to install SIGTERM handler: {err}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!("failed to wait for ctrl-c: {err}");
            }
        }
    }
}
