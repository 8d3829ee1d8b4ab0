// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leadline - a WhatsApp lead-capture bot.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod ingest;
mod leads;
mod models;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

/// Leadline - a WhatsApp lead-capture bot.
#[derive(Parser, Debug)]
#[command(name = "leadline", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the WhatsApp webhook and run the inactivity monitor.
    Serve,
    /// Ingest a document or a directory of documents for a tenant.
    Ingest {
        /// Tenant (business number) the documents belong to.
        #[arg(long)]
        tenant: String,
        /// File or directory to ingest (.txt and .md).
        path: PathBuf,
    },
    /// Print a tenant's leads as JSON, newest first.
    Leads {
        #[arg(long)]
        tenant: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => leadline_config::load_and_validate_path(path),
        None => leadline_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            leadline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Ingest { tenant, path } => ingest::run_ingest(&config, &tenant, &path).await,
        Commands::Leads { tenant } => leads::run_leads(&config, &tenant).await,
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("leadline: {e}");
        std::process::exit(1);
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
///
/// Logs go to stderr so `leadline leads` output stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
