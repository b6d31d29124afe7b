use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "meetplan", version, about = "Meeting time suggestions from calendars and availability")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where scheduling data is read from. Defaults to the local SQLite cache.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Read meetings and availability from a JSON snapshot file
    #[arg(long, global = true, value_name = "FILE", conflicts_with = "api")]
    pub data: Option<PathBuf>,

    /// Read from a REST backend at this base URL
    #[arg(long, global = true, value_name = "URL")]
    pub api: Option<String>,

    /// Bearer token for --api
    #[arg(long, global = true, requires = "api")]
    pub token: Option<String>,

    /// Fixed seed for score jitter
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest times for a new meeting
    Suggest(commands::suggest::SuggestArgs),
    /// Suggest times near an existing meeting
    Alternatives(commands::alternatives::AlternativesArgs),
    /// List meetings colliding with an interval
    Conflicts(commands::conflicts::ConflictsArgs),
    /// Import a JSON snapshot into the local cache
    Import(commands::import::ImportArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("MEETPLAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Suggest(args) => commands::suggest::run(&cli.source, args),
        Commands::Alternatives(args) => commands::alternatives::run(&cli.source, args),
        Commands::Conflicts(args) => commands::conflicts::run(&cli.source, args),
        Commands::Import(args) => commands::import::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
