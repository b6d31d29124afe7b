//! Async scheduling service.
//!
//! Validates a request, fetches a snapshot from the store and runs the
//! engine over it. Input errors are raised before any fetch; store failures
//! abort the whole request.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tokio_util::sync::CancellationToken;

use crate::engine::{
    normalize_participants, validate_duration, SchedulingSuggestion, SuggestionEngine,
    SuggestionRequest,
};
use crate::error::Result;
use crate::meeting::Meeting;
use crate::range::DateRange;
use crate::storage::Config;
use crate::store::{fetch_snapshot, SchedulingStore};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Engine plus store, one request per call.
pub struct SchedulingService<S> {
    engine: SuggestionEngine,
    store: S,
    fetch_timeout: StdDuration,
    seed: Option<u64>,
    clock: Clock,
}

impl<S: SchedulingStore> SchedulingService<S> {
    /// Create with default configuration
    pub fn new(store: S) -> Self {
        Self::from_config(store, &Config::default())
    }

    /// Create from configuration
    pub fn from_config(store: S, config: &Config) -> Self {
        Self {
            engine: SuggestionEngine::from_config(config),
            store,
            fetch_timeout: StdDuration::from_millis(config.store.fetch_timeout_ms),
            seed: config.seed,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_engine(mut self, engine: SuggestionEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Fix the jitter seed so results are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: StdDuration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Replace the wall clock used when no preferred date is given
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn engine(&self) -> &SuggestionEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fresh RNG per request so concurrent calls share nothing.
    fn rng(&self) -> Pcg64 {
        match self.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        }
    }

    /// Ranked suggestions for a new meeting.
    ///
    /// # Errors
    /// Input errors before any fetch, then store errors, timeouts or cancellation.
    pub async fn suggest(
        &self,
        request: &SuggestionRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<SchedulingSuggestion>> {
        let participants = request.validate()?;
        let now = (self.clock)();
        let window = self.engine.search_window(request, now)?;
        tracing::info!(
            participants = participants.len(),
            duration_minutes = request.duration_minutes,
            window_start = %window.start,
            "analyzing optimal meeting times"
        );

        // Duration is bounded by validation above
        let fetch_range = window.extended_by(Duration::minutes(request.duration_minutes))?;
        let snapshot =
            fetch_snapshot(&self.store, &participants, fetch_range, self.fetch_timeout, cancel).await?;

        let mut rng = self.rng();
        let suggestions = self.engine.suggest_in_window(
            window,
            request.duration_minutes,
            &participants,
            request.time_range,
            &snapshot,
            &mut rng,
        )?;
        tracing::info!(count = suggestions.len(), "suggestions ready");
        Ok(suggestions)
    }

    /// Ranked suggestions around an existing meeting time.
    pub async fn alternatives(
        &self,
        original_start: DateTime<Utc>,
        duration_minutes: i64,
        participant_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<SchedulingSuggestion>> {
        let duration = validate_duration(duration_minutes)?;
        let participants = normalize_participants(participant_ids)?;
        let window = self.engine.alternatives_window(original_start)?;
        tracing::info!(
            participants = participants.len(),
            original_start = %original_start,
            "searching alternative times"
        );

        let fetch_range = window.extended_by(duration)?;
        let snapshot =
            fetch_snapshot(&self.store, &participants, fetch_range, self.fetch_timeout, cancel).await?;

        let mut rng = self.rng();
        Ok(self
            .engine
            .suggest_in_window(window, duration_minutes, &participants, None, &snapshot, &mut rng)?)
    }

    /// Existing meetings colliding with `[start, end)`.
    pub async fn conflicts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        participant_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Meeting>> {
        let participants = normalize_participants(participant_ids)?;
        let range = DateRange::new(start, end)?;

        let snapshot =
            fetch_snapshot(&self.store, &participants, range, self.fetch_timeout, cancel).await?;
        Ok(self
            .engine
            .check_conflicts(range.start, range.end, &participants, &snapshot.meetings)?)
    }
}
