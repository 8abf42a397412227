// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::aggregator::{Orchestrator, Query};
use crate::config::OrchestratorConfig;
use crate::trace::FileTraceRecorder;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to answer
    pub query: String,

    /// Uploaded document the question refers to
    #[arg(long)]
    pub attachment: Option<String>,

    /// Print the full response as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Document to add (pdf, txt or md)
    pub path: PathBuf,

    /// Rebuild the index immediately instead of on the next query
    #[arg(long)]
    pub build: bool,
}

#[derive(Args, Debug)]
pub struct BuildIndexArgs {
    /// Print the build report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListTracesArgs {
    /// Maximum number of traces to show
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct ShowTraceArgs {
    /// Trace file name or path returned by `ask`
    pub locator: String,
}

fn load_config() -> Result<OrchestratorConfig> {
    dotenv::dotenv().ok();
    OrchestratorConfig::from_env().context("invalid configuration")
}

fn orchestrator() -> Result<Orchestrator> {
    Ok(Orchestrator::from_config(load_config()?)?)
}

pub async fn ask(args: AskArgs) -> Result<()> {
    let orchestrator = orchestrator()?;
    let mut query = Query::new(args.query);
    if let Some(attachment) = args.attachment {
        query = query.with_attachment(attachment);
    }

    let response = orchestrator.handle_query(&query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}\n", response.answer);
    let used: Vec<&str> = response.specialists_used.iter().map(|s| s.display_name()).collect();
    println!("Specialists: {}", used.join(", "));
    println!("Rationale:   {}", response.rationale);
    match (&response.trace_locator, &response.trace_error) {
        (Some(locator), _) => println!("Trace:       {}", locator),
        (None, Some(e)) => {
            warn!("Trace was not saved: {}", e);
            println!("Trace:       not saved ({})", e);
        }
        (None, None) => {}
    }
    Ok(())
}

pub async fn upload(args: UploadArgs) -> Result<()> {
    let orchestrator = orchestrator()?;
    let receipt = orchestrator.upload_document(&args.path).await?;
    println!(
        "Stored {} ({} bytes) at {}",
        receipt.filename,
        receipt.size_bytes,
        receipt.stored_path.display()
    );

    if args.build {
        let report = orchestrator.rebuild_index().await?;
        println!(
            "Index '{}' rebuilt: {} chunks from {} documents",
            report.index_name,
            report.chunk_count,
            report.documents.len()
        );
    }
    Ok(())
}

pub async fn build_index(args: BuildIndexArgs) -> Result<()> {
    let orchestrator = orchestrator()?;
    let report = orchestrator.rebuild_index().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    info!("Build of '{}' finished", report.index_name);
    println!(
        "Index '{}' generation {}: {} chunks ({}D) from {} documents",
        report.index_name,
        report.generation,
        report.chunk_count,
        report.dimension,
        report.documents.len()
    );
    for failure in &report.failures {
        println!("  skipped {}: {}", failure.path, failure.reason);
    }
    Ok(())
}

pub async fn list_traces(args: ListTracesArgs) -> Result<()> {
    let config = load_config()?;
    let recorder = FileTraceRecorder::new(config.paths.trace_dir);
    let names = recorder.list().await?;

    if names.is_empty() {
        println!("No traces in {}", recorder.dir().display());
    }
    for name in names.iter().take(args.limit) {
        println!("{}", name);
    }
    Ok(())
}

pub async fn show_trace(args: ShowTraceArgs) -> Result<()> {
    let config = load_config()?;
    let recorder = FileTraceRecorder::new(config.paths.trace_dir);
    let trace = recorder
        .load(&args.locator)
        .await
        .map_err(|e| anyhow!("cannot load trace {}: {}", args.locator, e))?;

    println!("{}", serde_json::to_string_pretty(&trace)?);
    Ok(())
}

pub async fn check_env() -> Result<()> {
    let orchestrator = orchestrator()?;
    print!("{}", orchestrator.environment_report().await);
    Ok(())
}
