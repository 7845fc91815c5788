// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `dashcorn` - operator CLI for the dashcorn observability fabric.

mod client;
mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{agent, app, config, hub};

#[derive(Parser)]
#[command(name = "dashcorn", version, about = "Observability fabric for multi-process web servers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the hub daemon
    Hub(hub::HubArgs),
    /// Manage supervised applications
    App(app::AppArgs),
    /// Inspect live agent state
    Agent(agent::AgentArgs),
    /// Manage the operator configuration file
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Hub(args) => hub::run(args).await,
        Commands::App(args) => app::run(args).await,
        Commands::Agent(args) => agent::run(args).await,
        Commands::Config(args) => config::run(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dashcorn: {err}");
            ExitCode::FAILURE
        }
    }
}
