//! Integration tests for the async scheduling service.
//!
//! Covers fetch failures, deadlines, cancellation and the SQLite cache
//! serving a full request.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use meetplan_core::{
    AvailabilityPreference, CancellationToken, Config, DataSourceError, DateRange, InMemoryStore, InputError,
    Meeting, SchedulingError, SchedulingService, SchedulingSnapshot, SchedulingStore, SqliteStore,
    SuggestionRequest,
};

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn monday(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, h, 0, 0).unwrap()
}

/// Store whose reads fail, hang or return bad rows, counting every call.
#[derive(Default)]
struct ScriptedStore {
    mode: Mode,
    calls: Arc<AtomicUsize>,
}

#[derive(Default, Clone, Copy)]
enum Mode {
    #[default]
    Unreachable,
    Slow,
    Malformed,
}

#[async_trait]
impl SchedulingStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_availability(&self, _: &[String]) -> Result<Vec<AvailabilityPreference>, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            Mode::Slow => {
                tokio::time::sleep(StdDuration::from_secs(30)).await;
                Ok(vec![])
            }
            _ => Ok(vec![]),
        }
    }

    async fn list_meetings(&self, participant_ids: &[String], _: DateRange) -> Result<Vec<Meeting>, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            Mode::Unreachable => Err(DataSourceError::Unreachable {
                store: "scripted".to_string(),
                message: "connection refused".to_string(),
            }),
            Mode::Slow => {
                tokio::time::sleep(StdDuration::from_secs(30)).await;
                Ok(vec![])
            }
            Mode::Malformed => Ok(vec![Meeting::new(
                "backwards",
                "",
                monday(11),
                monday(10),
                participant_ids.to_vec(),
            )]),
        }
    }
}

fn scripted(mode: Mode) -> (ScriptedStore, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (
        ScriptedStore {
            mode,
            calls: calls.clone(),
        },
        calls,
    )
}

fn request() -> SuggestionRequest {
    SuggestionRequest::new(ids(&["ana", "bruno"]), 60).with_preferred_date(monday(8))
}

#[tokio::test]
async fn test_input_errors_skip_the_fetch() {
    let (store, calls) = scripted(Mode::Unreachable);
    let service = SchedulingService::new(store);
    let cancel = CancellationToken::new();

    let err = service
        .suggest(&SuggestionRequest::new(ids(&["ana"]), 0), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Input(InputError::InvalidDuration { minutes: 0 })));

    let err = service
        .conflicts(monday(10), monday(9), &ids(&["ana"]), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Input(InputError::InvalidTimeRange { .. })));

    let err = service
        .alternatives(monday(10), 30, &[], &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Input(InputError::NoParticipants)));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_requests_fail_before_the_fetch() {
    let (store, calls) = scripted(Mode::Unreachable);
    let service = SchedulingService::new(store);
    let cancel = CancellationToken::new();

    let err = service
        .suggest(&SuggestionRequest::new(ids(&["ana"]), i64::MAX), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Input(InputError::InvalidDuration { minutes: i64::MAX })));

    let err = service
        .alternatives(monday(10), 1_000_000_000_000, &ids(&["ana"]), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Input(InputError::InvalidDuration { .. })));

    let late = DateTime::<Utc>::MAX_UTC - Duration::days(2);
    let err = service
        .suggest(&SuggestionRequest::new(ids(&["ana"]), 30).with_preferred_date(late), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Input(InputError::OutOfRange(_))));

    let err = service.alternatives(late, 30, &ids(&["ana"]), &cancel).await.unwrap_err();
    assert!(matches!(err, SchedulingError::Input(InputError::OutOfRange(_))));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_store_fails_the_request() {
    let (store, _) = scripted(Mode::Unreachable);
    let service = SchedulingService::new(store);

    let err = service.suggest(&request(), &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, SchedulingError::DataSource(DataSourceError::Unreachable { .. })));
}

#[tokio::test]
async fn test_malformed_rows_are_rejected() {
    let (store, _) = scripted(Mode::Malformed);
    let service = SchedulingService::new(store);

    let err = service.suggest(&request(), &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, SchedulingError::DataSource(DataSourceError::Malformed(_))));
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let (store, _) = scripted(Mode::Slow);
    let service = SchedulingService::new(store).with_fetch_timeout(StdDuration::from_millis(50));

    let err = service.suggest(&request(), &CancellationToken::new()).await.unwrap_err();
    match err {
        SchedulingError::DataSource(DataSourceError::Timeout { timeout_ms, .. }) => assert_eq!(timeout_ms, 50),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancellation_abandons_in_flight_fetch() {
    let (store, calls) = scripted(Mode::Slow);
    let service = SchedulingService::new(store);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = service.suggest(&request(), &cancel).await.unwrap_err();
    assert!(matches!(err, SchedulingError::Cancelled));
    assert!(calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_already_cancelled_token() {
    let (store, _) = scripted(Mode::Slow);
    let service = SchedulingService::new(store);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service
        .conflicts(monday(9), monday(10), &ids(&["ana"]), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Cancelled));
}

fn sample_snapshot() -> SchedulingSnapshot {
    SchedulingSnapshot::new(
        vec![
            Meeting::new("m1", "Planning", monday(9), monday(12), ids(&["ana"])),
            Meeting::new("m2", "Other team", monday(13), monday(14), ids(&["zoe"])),
        ],
        vec![AvailabilityPreference::new(
            "bruno",
            1,
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            true,
        )],
    )
}

#[tokio::test]
async fn test_seeded_service_is_reproducible() {
    let service = SchedulingService::new(InMemoryStore::new(sample_snapshot())).with_seed(11);
    let cancel = CancellationToken::new();

    let first = service.suggest(&request(), &cancel).await.unwrap();
    let second = service.suggest(&request(), &cancel).await.unwrap();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[tokio::test]
async fn test_clock_sets_default_search_start() {
    let service = SchedulingService::new(InMemoryStore::default())
        .with_seed(1)
        .with_clock(|| Utc.with_ymd_and_hms(2024, 3, 4, 6, 10, 0).unwrap());

    let suggestions = service
        .suggest(&SuggestionRequest::new(ids(&["ana"]), 30), &CancellationToken::new())
        .await
        .unwrap();

    // Grid starts at 06:00 but 06:00 itself precedes the clock
    assert_eq!(suggestions.len(), 10);
    assert!(suggestions.iter().all(|s| s.start_time >= monday(6) + Duration::minutes(30)));
}

#[tokio::test]
async fn test_sqlite_cache_serves_full_request() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("meetplan.db")).unwrap();
    let (meetings, availability) = store.import_snapshot(&sample_snapshot(), false).unwrap();
    assert_eq!((meetings, availability), (2, 1));

    let mut config = Config::default();
    config.seed = Some(5);
    config.search.candidate_selection = meetplan_core::CandidateSelection::TopScored;
    let service = SchedulingService::from_config(store, &config);
    let cancel = CancellationToken::new();

    let suggestions = service.suggest(&request(), &cancel).await.unwrap();
    assert!(!suggestions.is_empty());
    for s in &suggestions {
        // ana is busy 09:00-12:00 on Monday
        assert!(!(s.start_time < monday(12) && s.end_time > monday(9)));
        assert_eq!(s.total_participants, 2);
        assert!(s.available_participants >= 1);
    }

    let conflicts = service
        .conflicts(monday(11), monday(14), &ids(&["ana", "bruno"]), &cancel)
        .await
        .unwrap();
    assert_eq!(conflicts.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["m1"]);
}

#[tokio::test]
async fn test_alternatives_through_service() {
    let service = SchedulingService::new(InMemoryStore::new(sample_snapshot())).with_seed(3);
    let original = Utc.with_ymd_and_hms(2024, 3, 6, 14, 0, 0).unwrap();

    let suggestions = service
        .alternatives(original, 30, &ids(&["ana"]), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!suggestions.is_empty());
    for s in &suggestions {
        assert!(s.start_time >= original - Duration::days(3));
        assert!(s.start_time < original + Duration::days(3));
    }
}
