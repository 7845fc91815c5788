// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dashcorn hub` - run and stop the hub daemon.

use std::path::PathBuf;
use std::process::{Command as ProcessCommand, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use dashcorn_hub::PidFile;

use super::config::CliConfig;

#[derive(Args)]
pub struct HubArgs {
    #[command(subcommand)]
    pub command: HubCommand,
}

#[derive(Subcommand)]
pub enum HubCommand {
    /// Run the hub daemon
    Run {
        /// Host for the hub JSON API (defaults from the config file)
        #[arg(long)]
        host: Option<String>,
        /// Port for the hub JSON API (defaults from the config file)
        #[arg(long)]
        port: Option<u16>,
        /// Stay attached instead of detaching the daemon
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the hub daemon
    Stop,
    /// Check whether the hub daemon is running
    Status,
}

pub async fn run(args: HubArgs) -> Result<()> {
    match args.command {
        HubCommand::Run { host, port, foreground } => start(host, port, foreground),
        HubCommand::Stop => stop(),
        HubCommand::Status => status(),
    }
}

fn start(host: Option<String>, port: Option<u16>, foreground: bool) -> Result<()> {
    let pid_file = PidFile::new(PidFile::default_path());
    if pid_file.is_alive() {
        println!("Hub already running (pid {})", pid_file.read().unwrap_or_default());
        return Ok(());
    }

    let config = CliConfig::load_default()?;
    let daemon = find_daemon_binary()?;
    let mut command = ProcessCommand::new(&daemon);
    command
        .env("DASHCORN_HUB_HOST", host.unwrap_or(config.hub.host))
        .env("DASHCORN_HUB_PORT", port.unwrap_or(config.hub.port).to_string())
        .env("DASHCORN_PROM_HOST", config.hub.prom_host)
        .env("DASHCORN_PROM_PORT", config.hub.prom_port.to_string())
        .env(
            "DASHCORN_LEADER_ROTATE_INTERVAL",
            config.hub.leader_rotate_interval.to_string(),
        );

    if foreground {
        let exit = command.status().with_context(|| format!("failed to run {}", daemon.display()))?;
        if !exit.success() {
            bail!("hub exited with status {exit}");
        }
        return Ok(());
    }

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn {}", daemon.display()))?;
    println!("Hub started");
    Ok(())
}

fn stop() -> Result<()> {
    let pid_file = PidFile::new(PidFile::default_path());
    let Some(pid) = pid_file.read() else {
        println!("Hub not running");
        return Ok(());
    };
    if !pid_file.is_alive() {
        println!("Hub not running (removing stale pid file)");
        pid_file.remove();
        return Ok(());
    }
    let pid = i32::try_from(pid).map_err(|_| anyhow!("pid file holds a bogus pid: {pid}"))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).with_context(|| format!("failed to signal pid {pid}"))?;
    println!("Hub stopped (pid {pid})");
    Ok(())
}

fn status() -> Result<()> {
    let pid_file = PidFile::new(PidFile::default_path());
    if pid_file.is_alive() {
        println!("Hub running (pid {})", pid_file.read().unwrap_or_default());
    } else {
        println!("Hub not running");
    }
    Ok(())
}

/// The daemon normally sits next to this binary; fall back to PATH.
fn find_daemon_binary() -> Result<PathBuf> {
    if let Ok(current) = std::env::current_exe() {
        if let Some(dir) = current.parent() {
            let sibling = dir.join("dashcornd");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }
    Ok(PathBuf::from("dashcornd"))
}
