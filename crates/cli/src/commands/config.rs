// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dashcorn config` - manage `~/.config/dashcorn/config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};

use dashcorn_hub::config::config_dir;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print one value by dotted key (e.g. hub.port)
    Get { key: String },
    /// Set one value by dotted key
    Set { key: String, value: String },
    /// Open the configuration file in $EDITOR
    Edit,
    /// Reset the configuration file to defaults
    Reset,
    /// Show entries that differ from the defaults
    Diff,
    /// Replace the configuration with another file
    Import { path: PathBuf },
    /// Write the current configuration to a file
    Export { path: PathBuf },
}

/// Operator-facing configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub hub: HubSection,
    pub agent: AgentSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSection {
    pub host: String,
    pub port: u16,
    pub prom_host: String,
    pub prom_port: u16,
    pub leader_rotate_interval: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub interval: f64,
    pub metrics_address: String,
    pub control_address: String,
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5555,
            prom_host: "0.0.0.0".to_string(),
            prom_port: 9100,
            leader_rotate_interval: 5.0,
        }
    }
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            interval: 4.0,
            metrics_address: "127.0.0.1:5556".to_string(),
            control_address: "127.0.0.1:5557".to_string(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self { hub: HubSection::default(), agent: AgentSection::default() }
    }
}

impl CliConfig {
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path())
    }

    /// Load the file, defaulting when absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("malformed config at {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("failed to render configuration")?;
        std::fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))
    }

    fn to_toml(&self) -> Result<toml::Value> {
        toml::Value::try_from(self).context("failed to render configuration")
    }
}

pub fn run(args: ConfigArgs) -> Result<()> {
    let path = CliConfig::default_path();
    run_at(args, &path)
}

pub(crate) fn run_at(args: ConfigArgs, path: &Path) -> Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = CliConfig::load(path)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommand::Get { key } => {
            let config = CliConfig::load(path)?;
            match lookup(&config.to_toml()?, &key) {
                Some(value) => {
                    println!("{}", render_scalar(&value));
                    Ok(())
                }
                None => bail!("unknown key: {key}"),
            }
        }
        ConfigCommand::Set { key, value } => {
            let config = CliConfig::load(path)?;
            let mut tree = config.to_toml()?;
            set_path(&mut tree, &key, parse_scalar(&value))?;
            let updated: CliConfig =
                tree.try_into().with_context(|| format!("invalid value for {key}"))?;
            updated.save(path)?;
            Ok(())
        }
        ConfigCommand::Edit => {
            if !path.exists() {
                CliConfig::default().save(path)?;
            }
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
            let status = std::process::Command::new(&editor)
                .arg(path)
                .status()
                .with_context(|| format!("failed to launch {editor}"))?;
            if !status.success() {
                bail!("{editor} exited with status {status}");
            }
            // Validate what the edit left behind
            CliConfig::load(path)?;
            Ok(())
        }
        ConfigCommand::Reset => {
            CliConfig::default().save(path)?;
            println!("Configuration reset to defaults.");
            Ok(())
        }
        ConfigCommand::Diff => {
            let current = CliConfig::load(path)?.to_toml()?;
            let defaults = CliConfig::default().to_toml()?;
            let mut differences = Vec::new();
            collect_diff("", &defaults, &current, &mut differences);
            if differences.is_empty() {
                println!("No differences from defaults.");
            } else {
                for (key, default_value, current_value) in differences {
                    println!("{key}: {default_value} -> {current_value}");
                }
            }
            Ok(())
        }
        ConfigCommand::Import { path: source } => {
            let imported = CliConfig::load(&source)?;
            imported.save(path)?;
            println!("Imported configuration from {}.", source.display());
            Ok(())
        }
        ConfigCommand::Export { path: target } => {
            let config = CliConfig::load(path)?;
            config.save(&target)?;
            println!("Exported configuration to {}.", target.display());
            Ok(())
        }
    }
}

fn lookup(tree: &toml::Value, key: &str) -> Option<toml::Value> {
    let mut current = tree;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current.clone())
}

fn set_path(tree: &mut toml::Value, key: &str, value: toml::Value) -> Result<()> {
    let mut current = tree;
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, ancestors)) = parts.split_last() else {
        bail!("empty key");
    };
    for part in ancestors {
        current = current
            .get_mut(part)
            .with_context(|| format!("unknown section: {part}"))?;
    }
    let table = current.as_table_mut().with_context(|| format!("{key} is not settable"))?;
    if !table.contains_key(*last) {
        bail!("unknown key: {key}");
    }
    table.insert((*last).to_string(), value);
    Ok(())
}

/// Parse a scalar the way TOML would: numbers and booleans first, else a
/// plain string.
fn parse_scalar(raw: &str) -> toml::Value {
    if let Ok(value) = raw.parse::<i64>() {
        return toml::Value::Integer(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return toml::Value::Float(value);
    }
    if let Ok(value) = raw.parse::<bool>() {
        return toml::Value::Boolean(value);
    }
    toml::Value::String(raw.to_string())
}

fn render_scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn collect_diff(
    prefix: &str,
    defaults: &toml::Value,
    current: &toml::Value,
    out: &mut Vec<(String, String, String)>,
) {
    match (defaults, current) {
        (toml::Value::Table(default_table), toml::Value::Table(current_table)) => {
            for (key, default_value) in default_table {
                let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                match current_table.get(key) {
                    Some(current_value) => {
                        collect_diff(&path, default_value, current_value, out)
                    }
                    None => out.push((path, render_scalar(default_value), "(absent)".into())),
                }
            }
        }
        _ => {
            if defaults != current {
                out.push((prefix.to_string(), render_scalar(defaults), render_scalar(current)));
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
