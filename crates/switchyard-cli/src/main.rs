// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Switchyard Contributors

//! Switchyard CLI - wire a topology into a sink directory, inspect it and
//! probe its sinks.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use switchyard::{DirectoryProxy, PublishResult, SinkBufferClaim};
use tracing::{debug, info};

mod config;
mod report;
mod telemetry;
mod wiring;

use report::DirectoryReport;

/// Switchyard - location-transparent message sinks
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the slots, roles and views of the wired directory
    Inspect {
        /// Topology file
        #[arg(short, long, default_value = "switchyard.toml")]
        config: PathBuf,

        /// Show the warmup directory instead of the normal one
        #[arg(long, requires = "self_sink")]
        warmup: bool,

        /// Sink id of the service viewing the directory (kept in warmup)
        #[arg(long)]
        self_sink: Option<i32>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Publish test frames to one sink and report the result codes
    Probe {
        /// Topology file
        #[arg(short, long, default_value = "switchyard.toml")]
        config: PathBuf,

        /// Sink id to publish to
        #[arg(short, long)]
        sink: i32,

        /// Number of frames to publish
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Frame size in bytes
        #[arg(long, default_value_t = 64)]
        size: usize,

        /// Publish mode: blocking | try | claim
        #[arg(short, long, default_value = "blocking")]
        mode: ProbeMode,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ProbeMode {
    Blocking,
    Try,
    Claim,
}

#[derive(Debug, Serialize)]
struct ProbeSummary {
    sink: String,
    results: BTreeMap<&'static str, usize>,
    back_pressure: u64,
    delivered_locally: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_json)?;

    match cli.command {
        Commands::Inspect {
            config,
            warmup,
            self_sink,
            json,
        } => inspect(config, warmup, self_sink, json).await,
        Commands::Probe {
            config,
            sink,
            count,
            size,
            mode,
        } => probe(config, sink, count, size, mode).await,
    }
}

async fn inspect(config: PathBuf, warmup: bool, self_sink: Option<i32>, json: bool) -> Result<()> {
    let topology = config::load_topology(&config)
        .with_context(|| format!("failed to load topology from {}", config.display()))?;
    let wiring = wiring::build(&topology).await?;

    let report = match (warmup, self_sink) {
        (true, Some(self_sink)) => {
            let proxy = DirectoryProxy::new(self_sink, wiring.directory.clone());
            let directory = proxy
                .use_warmup()
                .context("failed to build warmup directory")?;
            DirectoryReport::capture(directory.as_ref(), true)
        }
        (true, None) => bail!("--warmup needs --self-sink"),
        (false, _) => DirectoryReport::capture(wiring.directory.as_ref(), false),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

async fn probe(
    config: PathBuf,
    sink_id: i32,
    count: usize,
    size: usize,
    mode: ProbeMode,
) -> Result<()> {
    let topology = config::load_topology(&config)
        .with_context(|| format!("failed to load topology from {}", config.display()))?;
    let mut wiring = wiring::build(&topology).await?;
    let reference = wiring.sink(sink_id)?;
    info!(sink = %reference, count, size, ?mode, "Probing sink");

    let payload = vec![0xA5u8; size];
    let mut results: BTreeMap<&'static str, usize> = BTreeMap::new();

    // Publishing may spin on back-pressure; keep it off the runtime threads.
    // A local queue is drained as frames land so a blocking probe cannot stall.
    let probe_ref = reference.clone();
    let reader = wiring.readers.remove(&sink_id);
    let (outcomes, delivered_locally) = tokio::task::spawn_blocking(move || {
        let mut reader = reader;
        let mut delivered = 0;
        let mut claim = SinkBufferClaim::new();
        let mut outcomes = Vec::with_capacity(count);
        for _ in 0..count {
            let outcome = match mode {
                ProbeMode::Blocking => probe_ref.publish(&payload),
                ProbeMode::Try => probe_ref.try_publish(&payload),
                ProbeMode::Claim => match probe_ref.try_claim(payload.len(), &mut claim) {
                    PublishResult::Ok => {
                        claim.buffer_mut().copy_from_slice(&payload);
                        claim.commit().unwrap_or(PublishResult::Failure)
                    }
                    other => other,
                },
            };
            outcomes.push(outcome);
            if let Some(reader) = reader.as_mut() {
                delivered += reader.poll(|_, _| {});
            }
        }
        (outcomes, reader.map(|_| delivered))
    })
    .await
    .context("probe task failed")?;

    for outcome in outcomes {
        debug!(result = %outcome, "Probe frame");
        *results.entry(outcome.name()).or_default() += 1;
    }

    let summary = ProbeSummary {
        sink: reference.to_string(),
        results,
        back_pressure: reference.back_pressure_intensity(),
        delivered_locally,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
