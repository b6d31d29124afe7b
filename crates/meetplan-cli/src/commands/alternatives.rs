use chrono::{DateTime, Utc};
use clap::Args;

use crate::common::{self, parse_instant, CliResult};
use crate::SourceArgs;

#[derive(Args)]
pub struct AlternativesArgs {
    /// Start of the meeting being moved
    #[arg(long, value_parser = parse_instant)]
    pub start: DateTime<Utc>,
    /// Meeting length in minutes
    #[arg(short, long, allow_negative_numbers = true)]
    pub duration: i64,
    /// Participant ids, comma separated
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub participants: Vec<String>,
    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(source: &SourceArgs, args: AlternativesArgs) -> CliResult {
    let service = common::service(source)?;
    let AlternativesArgs {
        start,
        duration,
        participants,
        json,
    } = args;

    let suggestions = common::block_on(|cancel| async move {
        service.alternatives(start, duration, &participants, &cancel).await
    })?;
    common::print_suggestions(&suggestions, json)
}
