//! Shared helpers for CLI commands.

use std::error::Error;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use meetplan_core::{
    CancellationToken, Config, DailyWindow, InMemoryStore, RestStore, SchedulingError, SchedulingService,
    SchedulingStore, SchedulingSuggestion, SqliteStore,
};

use crate::SourceArgs;

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// Open the store selected by the global flags.
pub fn open_store(source: &SourceArgs, config: &Config) -> CliResult<Box<dyn SchedulingStore>> {
    if let Some(path) = &source.data {
        return Ok(Box::new(InMemoryStore::from_json_file(path)?));
    }
    if let Some(url) = &source.api {
        let mut store =
            RestStore::new(url)?.with_request_timeout(Duration::from_millis(config.store.fetch_timeout_ms))?;
        if let Some(token) = &source.token {
            store = store.with_token(token.clone());
        }
        return Ok(Box::new(store));
    }
    Ok(Box::new(SqliteStore::open_default()?))
}

/// Service over the selected store, configured from `config.toml`.
pub fn service(source: &SourceArgs) -> CliResult<SchedulingService<Box<dyn SchedulingStore>>> {
    let config = Config::load_or_default();
    let mut service = SchedulingService::from_config(open_store(source, &config)?, &config);
    if let Some(seed) = source.seed {
        service = service.with_seed(seed);
    }
    Ok(service)
}

/// Run one request on a fresh runtime. Ctrl-C cancels in-flight fetches.
pub fn block_on<F, Fut, T>(request: F) -> CliResult<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, SchedulingError>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let value = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                watcher.cancel();
            }
        });
        request(cancel).await
    })?;
    Ok(value)
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD`; naive values are UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date/time '{raw}' (expected RFC 3339 or YYYY-MM-DD[THH:MM])"))
}

pub fn parse_window(raw: &str) -> Result<DailyWindow, String> {
    DailyWindow::parse(raw).map_err(|e| e.to_string())
}

pub fn print_suggestions(suggestions: &[SchedulingSuggestion], json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(suggestions)?);
        return Ok(());
    }
    if suggestions.is_empty() {
        println!("No free slots found.");
        return Ok(());
    }
    for (rank, s) in suggestions.iter().enumerate() {
        println!(
            "{:>2}. {} {}-{} UTC  score {:>5.1}  {}/{} available  {}",
            rank + 1,
            s.start_time.format("%a %Y-%m-%d"),
            s.start_time.format("%H:%M"),
            s.end_time.format("%H:%M"),
            s.confidence_score,
            s.available_participants,
            s.total_participants,
            s.reasoning
        );
    }
    Ok(())
}
