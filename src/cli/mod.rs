// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Nebula query orchestrator CLI
#[derive(Parser, Debug)]
#[command(name = "nebula")]
#[command(version)]
#[command(about = "Route questions across document, web and literature retrieval", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a query
    Ask(commands::AskArgs),

    /// Add a document to the documents directory and invalidate the index
    Upload(commands::UploadArgs),

    /// Rebuild the document index now
    BuildIndex(commands::BuildIndexArgs),

    /// Browse recorded traces
    Traces {
        #[command(subcommand)]
        action: TraceCommand,
    },

    /// Report which collaborators are configured
    CheckEnv,
}

#[derive(Subcommand, Debug)]
pub enum TraceCommand {
    /// List trace files, newest first
    List(commands::ListTracesArgs),

    /// Print one trace
    Show(commands::ShowTraceArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask(args) => commands::ask(args).await,
        Commands::Upload(args) => commands::upload(args).await,
        Commands::BuildIndex(args) => commands::build_index(args).await,
        Commands::Traces { action } => match action {
            TraceCommand::List(args) => commands::list_traces(args).await,
            TraceCommand::Show(args) => commands::show_trace(args).await,
        },
        Commands::CheckEnv => commands::check_env().await,
    }
}
