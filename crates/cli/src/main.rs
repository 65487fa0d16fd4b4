//! Packwarden CLI — the main entry point.
//!
//! Commands:
//! - `serve`  — Start the HTTP gateway over the packs directory
//! - `list`   — List every registered operation
//! - `call`   — Dispatch one operation and print the result
//! - `check`  — Load the packs directory and report rejected packs

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Parser)]
#[command(
    name = "packwarden",
    about = "Packwarden — schema-validated, context-gated pack operations",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml (defaults to ~/.packwarden/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the packs directory
    #[arg(long, global = true)]
    packs_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List registered operations
    List {
        /// Print the full discovery document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dispatch an operation by id or tool name
    Call {
        /// Operation id (`pack.<pack_id>.<method>`) or tool name
        name: String,

        /// Context as an inline JSON object
        #[arg(short, long, conflicts_with = "context_file")]
        context: Option<String>,

        /// Read the context from a JSON file
        #[arg(long)]
        context_file: Option<PathBuf>,
    },

    /// Load every pack and report the ones that were rejected
    Check,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.packs_dir)?;

    let success = match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::List { json } => commands::list::run(&config, json)?,
        Commands::Call {
            name,
            context,
            context_file,
        } => commands::call::run(&config, &name, context, context_file).await?,
        Commands::Check => commands::check::run(&config)?,
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
