// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dashcorn agent` - inspect live agent state through the hub JSON API.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand, ValueEnum};

use super::config::CliConfig;

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommand,
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Show master or workers status per host
    Show {
        #[arg(value_enum)]
        kind: ShowKind,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowKind {
    Master,
    Workers,
}

pub async fn run(args: AgentArgs) -> Result<()> {
    match args.command {
        AgentCommand::Show { kind } => show(kind).await,
    }
}

async fn show(kind: ShowKind) -> Result<()> {
    let config = CliConfig::load_default()?;
    let url = format!("http://{}:{}/metrics", config.hub.host, config.hub.port);
    let snapshot: serde_json::Value = reqwest::get(&url)
        .await
        .with_context(|| format!("failed to connect to the hub at {url}"))?
        .json()
        .await
        .context("hub returned a malformed snapshot")?;

    let Some(servers) = snapshot.get("server").and_then(serde_json::Value::as_object) else {
        bail!("hub snapshot has no 'server' section");
    };
    if servers.is_empty() {
        println!("No agents reporting.");
        return Ok(());
    }

    for (host, info) in servers {
        println!("\nHost: {host}");
        match kind {
            ShowKind::Master => print_master(info),
            ShowKind::Workers => print_workers(info),
        }
    }
    Ok(())
}

fn print_master(info: &serde_json::Value) {
    let master = info.get("master").and_then(serde_json::Value::as_object);
    match master {
        Some(master) if !master.is_empty() => {
            println!(
                "  master pid {} cpu {:.1}% rss {} threads {}",
                field(master.get("pid")),
                master.get("cpu").and_then(serde_json::Value::as_f64).unwrap_or_default(),
                field(master.get("memory")),
                field(master.get("num_threads")),
            );
        }
        _ => println!("  master: (no live master info)"),
    }
}

fn print_workers(info: &serde_json::Value) {
    let Some(workers) = info.get("workers").and_then(serde_json::Value::as_object) else {
        println!("  workers: (none)");
        return;
    };
    if workers.is_empty() {
        println!("  workers: (none)");
        return;
    }
    println!("  {:<8}{:<10}{:<14}{}", "PID", "CPU %", "RSS bytes", "Threads");
    for (pid, worker) in workers {
        println!(
            "  {:<8}{:<10.1}{:<14}{}",
            pid,
            worker.get("cpu").and_then(serde_json::Value::as_f64).unwrap_or_default(),
            field(worker.get("memory")),
            field(worker.get("num_threads")),
        );
    }
}

fn field(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        _ => "-".to_string(),
    }
}
