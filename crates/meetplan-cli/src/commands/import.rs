use std::path::PathBuf;

use clap::Args;
use meetplan_core::{InMemoryStore, SqliteStore};
use serde::Serialize;

use crate::common::CliResult;

#[derive(Args)]
pub struct ImportArgs {
    /// JSON snapshot with "meetings" and "availability" arrays
    pub file: PathBuf,
    /// Cache database (defaults to the data directory)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
    /// Replace the cache contents instead of merging into them
    #[arg(long)]
    pub replace: bool,
}

#[derive(Serialize)]
struct ImportSummary {
    meetings: usize,
    availability: usize,
    replaced: bool,
}

pub fn run(args: ImportArgs) -> CliResult {
    let snapshot = InMemoryStore::from_json_file(&args.file)?;
    let store = match &args.db {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_default()?,
    };

    let (meetings, availability) = store.import_snapshot(snapshot.snapshot(), args.replace)?;
    tracing::info!(meetings, availability, file = %args.file.display(), "imported snapshot");

    let summary = ImportSummary {
        meetings,
        availability,
        replaced: args.replace,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
