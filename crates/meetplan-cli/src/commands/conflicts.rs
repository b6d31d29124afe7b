use chrono::{DateTime, Utc};
use clap::Args;

use crate::common::{self, parse_instant, CliResult};
use crate::SourceArgs;

#[derive(Args)]
pub struct ConflictsArgs {
    #[arg(long, value_parser = parse_instant)]
    pub start: DateTime<Utc>,
    #[arg(long, value_parser = parse_instant)]
    pub end: DateTime<Utc>,
    /// Participant ids, comma separated
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub participants: Vec<String>,
    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(source: &SourceArgs, args: ConflictsArgs) -> CliResult {
    let service = common::service(source)?;
    let ConflictsArgs {
        start,
        end,
        participants,
        json,
    } = args;

    let meetings = common::block_on(|cancel| async move {
        service.conflicts(start, end, &participants, &cancel).await
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meetings)?);
    } else if meetings.is_empty() {
        println!("No conflicts.");
    } else {
        for m in &meetings {
            println!(
                "{}  {} - {}  {}  [{}]",
                m.id,
                m.start_time.format("%Y-%m-%d %H:%M"),
                m.end_time.format("%H:%M"),
                m.title,
                m.participants.join(", ")
            );
        }
    }
    Ok(())
}
