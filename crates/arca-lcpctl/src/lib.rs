//! Operator tool for the LCP name mapping snapshot.
//!
//! Works offline: it never talks to the dataplane, only to the naming rules
//! and the snapshot file the state manager maintains.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use arca_lcp::naming::{parse_components, translate};
use arca_lcp::{
    validate_mappings, FileMappingStore, LcpConfig, LcpError, MappingStore, PersistedMapping,
    DEFAULT_CONFIG_PATH,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

/// Inspect and maintain arca-router LCP interface name mappings
#[derive(Parser, Debug)]
#[command(name = "arca-lcpctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Mapping snapshot path (overrides configuration)
    #[arg(long)]
    pub mapping_path: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate Junos interface names to Linux interface names
    Convert {
        #[arg(required = true)]
        device_names: Vec<String>,
    },

    /// Show the components of a Junos interface name
    Parse { device_name: String },

    /// Print the persisted mappings
    Show,

    /// Check the persisted mappings for duplicates and malformed names
    Validate,

    /// Delete the mapping snapshot
    Purge {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Loads configuration and applies command line overrides.
pub fn resolve_config(cli: &Cli) -> Result<LcpConfig> {
    let mut config = LcpConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(path) = &cli.mapping_path {
        config.persistence.mapping_path = path.clone();
    }
    Ok(config)
}

/// Operator action for the first LCP error in the chain, if any.
pub fn error_action(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<LcpError>())
        .map(LcpError::action)
}

/// Runs one command, writing its output to `out`.
pub fn run(cli: &Cli, config: &LcpConfig, out: &mut impl Write) -> Result<()> {
    match &cli.command {
        Commands::Convert { device_names } => convert(device_names, cli.json, out),
        Commands::Parse { device_name } => parse(device_name, cli.json, out),
        Commands::Show => show(&FileMappingStore::from_config(config), cli.json, out),
        Commands::Validate => validate(&FileMappingStore::from_config(config), out),
        Commands::Purge { yes } => purge(&FileMappingStore::from_config(config), *yes, out),
    }
}

fn convert(device_names: &[String], as_json: bool, out: &mut impl Write) -> Result<()> {
    let mut rows = Vec::with_capacity(device_names.len());
    for device_name in device_names {
        let kernel = translate(device_name)?;
        rows.push((device_name.as_str(), kernel));
    }

    if as_json {
        let value: Vec<_> = rows
            .iter()
            .map(|(device, kernel)| {
                json!({
                    "junos_name": device,
                    "linux_name": kernel.name,
                    "hashed": kernel.is_hashed(),
                })
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        return Ok(());
    }

    for (device, kernel) in rows {
        let note = if kernel.is_hashed() { "  (hashed)" } else { "" };
        writeln!(out, "{:<24} {}{}", device, kernel.name, note)?;
    }
    Ok(())
}

fn parse(device_name: &str, as_json: bool, out: &mut impl Write) -> Result<()> {
    let parts = parse_components(device_name)?;

    if as_json {
        let value = json!({
            "type": parts.if_type,
            "fpc": parts.fpc,
            "pic": parts.pic,
            "port": parts.port,
            "vlan": parts.vlan,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        return Ok(());
    }

    writeln!(out, "type: {}", parts.if_type)?;
    writeln!(out, "fpc:  {}", parts.fpc)?;
    writeln!(out, "pic:  {}", parts.pic)?;
    writeln!(out, "port: {}", parts.port)?;
    writeln!(out, "vlan: {}", parts.vlan.as_deref().unwrap_or("-"))?;
    Ok(())
}

fn show(store: &FileMappingStore, as_json: bool, out: &mut impl Write) -> Result<()> {
    let mut mappings = store
        .load()
        .with_context(|| format!("reading {}", store.path().display()))?;
    mappings.sort_by_key(|m| m.sw_if_index);

    if as_json {
        writeln!(out, "{}", serde_json::to_string_pretty(&mappings)?)?;
        return Ok(());
    }

    write_table(&mappings, out)
}

fn write_table(mappings: &[PersistedMapping], out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "{:>11}  {:<15}  {:<24}  {:<4}  {}",
        "SW_IF_INDEX", "LINUX", "JUNOS", "TYPE", "NETNS"
    )?;
    for m in mappings {
        writeln!(
            out,
            "{:>11}  {:<15}  {:<24}  {:<4}  {}",
            m.sw_if_index,
            m.linux_name,
            if m.junos_name.is_empty() { "-" } else { m.junos_name.as_str() },
            m.host_if_type.as_str(),
            if m.netns.is_empty() { "-" } else { m.netns.as_str() },
        )?;
    }
    Ok(())
}

fn validate(store: &FileMappingStore, out: &mut impl Write) -> Result<()> {
    let mappings = store
        .load()
        .with_context(|| format!("reading {}", store.path().display()))?;

    let issues = validate_mappings(&mappings);
    if issues.is_empty() {
        writeln!(out, "{}: {} mappings OK", store.path().display(), mappings.len())?;
        return Ok(());
    }

    for issue in &issues {
        writeln!(out, "{}", issue)?;
    }
    warn!(count = issues.len(), path = %store.path().display(), "Mapping snapshot is invalid");
    bail!("{} validation issue(s) in {}", issues.len(), store.path().display())
}

fn purge(store: &FileMappingStore, confirmed: bool, out: &mut impl Write) -> Result<()> {
    if !confirmed {
        bail!(
            "refusing to delete {} without --yes (Junos names are lost until re-applied)",
            store.path().display()
        );
    }

    store
        .delete()
        .with_context(|| format!("deleting {}", store.path().display()))?;
    info!(path = %store.path().display(), "Purged LCP mapping snapshot");
    writeln!(out, "deleted {}", store.path().display())?;
    Ok(())
}
