// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Osscatalog CLI - inspect OSS records in the IBM Cloud Global Catalog

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use osscatalog::commands::{self, Session};
use osscatalog::context::Environment;

#[derive(Parser)]
#[command(name = "osscatalog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "OSSCAT_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Key file with named API keys
    #[arg(long)]
    key_file: Option<std::path::PathBuf>,

    /// Target environment (staging, prod-ro, prod-rw)
    #[arg(long, default_value = "prod-ro")]
    env: Environment,

    /// Downgrade consistency failures to warnings
    #[arg(long)]
    lenient: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one OSS entry by id
    Get {
        /// Entry id, e.g. oss.cloud-object-storage
        id: String,

        /// Comma-separated include flags (services, tribes, merge-control, us-regulated, ...)
        #[arg(long)]
        include: Option<String>,
    },

    /// List OSS entries
    ListOss {
        /// Glob on top-level entry names
        #[arg(long)]
        pattern: Option<String>,

        /// Comma-separated include flags
        #[arg(long)]
        include: Option<String>,
    },

    /// List Main catalog entries
    ListMain {
        /// Glob on top-level entry names
        #[arg(long)]
        pattern: Option<String>,

        /// Also descend into plans, flavors and profiles
        #[arg(long)]
        deployments: bool,
    },

    /// Delete one OSS entry by id
    Delete {
        /// Entry id
        id: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins when set
    let log_level = match cli.verbose {
        0 if cli.quiet => tracing::Level::ERROR,
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("osscatalog={log_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        return commands::completions::run(shell, &mut Cli::command());
    }

    let session = Session::load(
        cli.config.as_deref(),
        cli.key_file.as_deref(),
        cli.env,
        cli.lenient,
        cli.json,
        cli.no_color,
    )?;

    match cli.command {
        Commands::Get { id, include } => {
            commands::get::run(&session, &id, include.as_deref())
        }
        Commands::ListOss { pattern, include } => {
            commands::list::run_oss(&session, pattern.as_deref(), include.as_deref())
        }
        Commands::ListMain { pattern, deployments } => {
            commands::list::run_main(&session, pattern.as_deref(), deployments)
        }
        Commands::Delete { id } => {
            commands::delete::run(&session, &id)
        }
        Commands::Completions { .. } => Ok(()),
    }
}
