//! ZoneFlow daemon
//!
//! The production deployment wires the controller to a switch control
//! channel provided by an external protocol library. This binary covers the
//! operational surface that does not need a live switch:
//!
//! ```bash
//! zoneflowd --config campus.json validate
//! zoneflowd --config campus.json replay traffic.jsonl
//! zoneflowd --config campus.json replay traffic.jsonl --json
//! ```
//!
//! `replay` feeds packet-in events from a JSON-lines file through a full
//! controller instance with an in-memory channel, then reports every
//! terminal decision and planned flow install.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zoneflow_common::{MemorySink, PortNo, SwitchId};
use zoneflow_controller::{Controller, ControllerConfig, PacketIn, RecordingChannel};

#[derive(Parser)]
#[command(name = "zoneflowd", about = "ZoneFlow controller daemon")]
struct Cli {
    /// Path to the controller configuration (JSON)
    #[arg(long, env = "ZONEFLOW_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate the configuration, then exit
    Validate,
    /// Replay packet-in events from a JSON-lines capture
    Replay {
        /// Capture file: one JSON event per line
        events: PathBuf,
        /// Print every decision record as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

/// One captured packet-in event
#[derive(Debug, Deserialize)]
struct ReplayEvent {
    switch: u64,
    ingress: u32,
    /// Hex-encoded frame bytes
    frame: String,
    #[serde(default)]
    buffer_id: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = ControllerConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Validate => validate(&config),
        Command::Replay { events, json } => replay(&config, &events, json).await,
    }
}

fn validate(config: &ControllerConfig) -> Result<()> {
    let classifier = config.build_classifier()?;
    let rules = config.build_rules();
    info!(
        zone_ranges = classifier.len(),
        policy_rules = rules.len(),
        port_assignments = config.port_zones.len(),
        "configuration valid"
    );
    Ok(())
}

async fn replay(config: &ControllerConfig, events: &PathBuf, json: bool) -> Result<()> {
    let channel = Arc::new(RecordingChannel::new());
    let sink = Arc::new(MemorySink::new());
    let controller = Controller::from_config(config, channel.clone(), sink.clone())?;

    let text = std::fs::read_to_string(events)
        .with_context(|| format!("reading {}", events.display()))?;

    let mut switches_seen = BTreeSet::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: ReplayEvent = serde_json::from_str(line)
            .with_context(|| format!("{}:{}", events.display(), lineno + 1))?;
        let frame = hex::decode(event.frame.trim())
            .with_context(|| format!("{}:{}: bad frame hex", events.display(), lineno + 1))?;

        let switch = SwitchId(event.switch);
        if switches_seen.insert(switch) {
            controller.on_switch_connected(switch).await;
        }

        controller
            .handle_packet_in(PacketIn {
                switch,
                ingress: PortNo(event.ingress),
                frame: Bytes::from(frame),
                buffer_id: event.buffer_id,
            })
            .await;
    }

    if json {
        for record in sink.records() {
            println!("{}", serde_json::to_string(&record)?);
        }
    }

    let stats = controller.stats();
    info!(
        packets_in = stats.packets_in,
        forwarded = stats.forwarded,
        flooded = stats.flooded,
        dropped = stats.dropped,
        ignored = stats.ignored,
        flows_installed = stats.flows_installed,
        "replay complete"
    );
    Ok(())
}
