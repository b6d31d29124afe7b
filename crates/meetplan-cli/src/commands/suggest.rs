use chrono::{DateTime, Utc};
use clap::Args;
use meetplan_core::{DailyWindow, SuggestionRequest};

use crate::common::{self, parse_instant, parse_window, CliResult};
use crate::SourceArgs;

#[derive(Args)]
pub struct SuggestArgs {
    /// Participant ids, comma separated
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub participants: Vec<String>,
    /// Meeting length in minutes
    #[arg(short, long, allow_negative_numbers = true)]
    pub duration: i64,
    /// Start of the search horizon (defaults to now)
    #[arg(long, value_parser = parse_instant)]
    pub date: Option<DateTime<Utc>>,
    /// Only keep slots inside this daily window, e.g. 09:00-17:00
    #[arg(long, value_parser = parse_window)]
    pub window: Option<DailyWindow>,
    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(source: &SourceArgs, args: SuggestArgs) -> CliResult {
    let mut request = SuggestionRequest::new(args.participants, args.duration);
    if let Some(date) = args.date {
        request = request.with_preferred_date(date);
    }
    if let Some(window) = args.window {
        request = request.with_time_range(window);
    }

    let service = common::service(source)?;
    let suggestions = common::block_on(|cancel| async move { service.suggest(&request, &cancel).await })?;
    common::print_suggestions(&suggestions, args.json)
}
