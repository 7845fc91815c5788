// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dashcorn app` - manage supervised applications.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use dashcorn_wire::{Command, Reply, ReplyStatus, StartArgs};

use crate::client::ControlClient;

#[derive(Args)]
pub struct AppArgs {
    #[command(subcommand)]
    pub command: AppCommand,
}

#[derive(Subcommand)]
pub enum AppCommand {
    /// Start an application by name and path
    Start {
        name: String,
        app_path: String,
        /// Name of the app variable inside the module
        #[arg(long, default_value = "app")]
        app_object: String,
        /// PYTHONPATH for the child process
        #[arg(long)]
        python_path: Option<String>,
        /// Host to bind the app
        #[arg(long)]
        host: Option<String>,
        /// Port to bind the app
        #[arg(long)]
        port: Option<u16>,
        /// Number of workers
        #[arg(long)]
        workers: Option<u32>,
        /// Working directory for the child process
        #[arg(long = "working-dir")]
        cwd: Option<String>,
    },
    /// Stop the application by name
    Stop { name: String },
    /// Restart the application
    Restart { name: String },
    /// List all managed processes
    List,
    /// Remove the application from the managed list without signaling
    Delete { name: String },
}

pub async fn run(args: AppArgs) -> Result<()> {
    let client = ControlClient::new();
    match args.command {
        AppCommand::Start { name, app_path, app_object, python_path, host, port, workers, cwd } => {
            let start = StartArgs {
                name: name.clone(),
                app_path,
                app_object,
                python_path,
                host,
                port,
                workers,
                cwd,
            };
            let reply = client.send(&Command::Start(start)).await;
            match reply.status {
                ReplyStatus::AlreadyExists => {
                    println!("[dashcorn] Process '{name}' already exists.");
                    Ok(())
                }
                ReplyStatus::Ok => {
                    let pid = reply.proc_record.map(|record| record.pid).unwrap_or_default();
                    println!("[dashcorn] Process '{name}' started, pid: {pid}");
                    Ok(())
                }
                _ => fail(&reply),
            }
        }
        AppCommand::Stop { name } => {
            let reply = client.send(&Command::Stop { name: name.clone() }).await;
            match reply.status {
                ReplyStatus::NotFound => {
                    println!("[dashcorn] Process '{name}' not found.");
                    Ok(())
                }
                ReplyStatus::AlreadyStopped => {
                    println!("[dashcorn] Process '{name}' already stopped.");
                    Ok(())
                }
                ReplyStatus::Ok => {
                    let pid = reply.pid.unwrap_or_default();
                    println!("[dashcorn] Stopped process '{name}' (PID: {pid})");
                    Ok(())
                }
                _ => fail(&reply),
            }
        }
        AppCommand::Restart { name } => {
            let reply = client.send(&Command::Restart { name: name.clone() }).await;
            match reply.status {
                ReplyStatus::NotFound => {
                    println!("[dashcorn] Process '{name}' not found.");
                    Ok(())
                }
                ReplyStatus::Ok => {
                    println!("[dashcorn] Process '{name}' restarted.");
                    Ok(())
                }
                _ => fail(&reply),
            }
        }
        AppCommand::List => {
            let reply = client.send(&Command::List {}).await;
            if reply.status != ReplyStatus::Ok {
                return fail(&reply);
            }
            println!("{:<15}{:<8}{:<10}{}", "Name", "PID", "Status", "App Path");
            println!("{}", "-".repeat(60));
            for process in reply.processes.unwrap_or_default() {
                println!(
                    "{:<15}{:<8}{:<10}{}",
                    process.name,
                    process.pid,
                    match process.status {
                        dashcorn_wire::RunStatus::Running => "running",
                        dashcorn_wire::RunStatus::Crashed => "crashed",
                    },
                    process.app_path.unwrap_or_default()
                );
            }
            Ok(())
        }
        AppCommand::Delete { name } => {
            let reply = client.send(&Command::Delete { name: name.clone() }).await;
            match reply.status {
                ReplyStatus::NotFound => {
                    println!("[dashcorn] Process '{name}' not found.");
                    Ok(())
                }
                ReplyStatus::Ok => {
                    println!("[dashcorn] Deleted process '{name}' from list.");
                    Ok(())
                }
                _ => fail(&reply),
            }
        }
    }
}

fn fail(reply: &Reply) -> Result<()> {
    bail!("{}", reply.message.clone().unwrap_or_else(|| "unexpected supervisor reply".to_string()))
}
