//! Suggestion engine.
//!
//! Drives one request through generation, conflict resolution, scoring and
//! ranking. The engine holds configuration and a scorer only; every call owns
//! its working set, so one engine can serve concurrent requests.
//!
//! All operations here are pure functions of their inputs: the caller fetches
//! a [`SchedulingSnapshot`] and passes it in, together with the RNG used for
//! score jitter. See [`crate::service`] for the async wrapper that fetches
//! from a store.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::availability::{AvailabilityIndex, AvailabilityPreference};
use crate::error::{DataSourceError, InputError};
use crate::meeting::{conflicting_meetings, Meeting};
use crate::range::{checked_shift, days_delta, DailyWindow, DateRange};
use crate::scoring::{HeuristicScorer, SlotScorer};
use crate::slots::{slot_duration, ConflictResolver, ConflictRule, SlotGenerator, TimeSlot};
use crate::storage::Config;

/// Which available slots are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSelection {
    /// The first `max_candidates` available slots in generation order
    #[default]
    FirstGenerated,
    /// Score every available slot and keep the best `max_candidates`
    TopScored,
}

/// A ranked proposal for a new meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingSuggestion {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub confidence_score: f64,
    pub reasoning: String,
    /// Number of colliding meetings
    pub conflicts: usize,
    pub available_participants: usize,
    pub total_participants: usize,
}

/// Availability and meetings fetched for one request.
///
/// Owned by the caller; the engine only borrows it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingSnapshot {
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub availability: Vec<AvailabilityPreference>,
}

impl SchedulingSnapshot {
    pub fn new(meetings: Vec<Meeting>, availability: Vec<AvailabilityPreference>) -> Self {
        Self {
            meetings,
            availability,
        }
    }

    /// Reject data that violates the model.
    pub fn validate(&self) -> Result<(), DataSourceError> {
        for meeting in &self.meetings {
            meeting.validate()?;
        }
        for pref in &self.availability {
            pref.validate()?;
        }
        Ok(())
    }
}

/// Input to [`SuggestionEngine::analyze_optimal_times`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub participant_ids: Vec<String>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub preferred_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_range: Option<DailyWindow>,
}

impl SuggestionRequest {
    pub fn new(participant_ids: Vec<String>, duration_minutes: i64) -> Self {
        Self {
            participant_ids,
            duration_minutes,
            preferred_date: None,
            time_range: None,
        }
    }

    pub fn with_preferred_date(mut self, date: DateTime<Utc>) -> Self {
        self.preferred_date = Some(date);
        self
    }

    pub fn with_time_range(mut self, window: DailyWindow) -> Self {
        self.time_range = Some(window);
        self
    }

    /// Validated, de-duplicated participant ids.
    pub fn validate(&self) -> Result<Vec<String>, InputError> {
        validate_duration(self.duration_minutes)?;
        normalize_participants(&self.participant_ids)
    }
}

/// Meeting length as a `Duration`, bounded to one week.
pub(crate) fn validate_duration(minutes: i64) -> Result<Duration, InputError> {
    slot_duration(minutes)
}

/// Trim ids, drop blanks and duplicates (first occurrence wins).
pub(crate) fn normalize_participants(ids: &[String]) -> Result<Vec<String>, InputError> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim();
        if !id.is_empty() && !out.iter().any(|existing| existing == id) {
            out.push(id.to_string());
        }
    }
    if out.is_empty() {
        return Err(InputError::NoParticipants);
    }
    Ok(out)
}

/// Ranks conflict-free meeting windows.
pub struct SuggestionEngine {
    generator: SlotGenerator,
    conflict_rule: ConflictRule,
    horizon_days: i64,
    alternatives_days: i64,
    max_candidates: usize,
    selection: CandidateSelection,
    scorer: Box<dyn SlotScorer>,
}

impl SuggestionEngine {
    /// Create an engine with default settings and the heuristic scorer
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Create from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            generator: SlotGenerator::new().with_step(config.slots.step_minutes),
            conflict_rule: config.search.conflict_rule,
            horizon_days: config.search.horizon_days.max(1),
            alternatives_days: config.search.alternatives_days.max(1),
            max_candidates: config.search.max_candidates,
            selection: config.search.candidate_selection,
            scorer: Box::new(HeuristicScorer::with_weights(config.scoring.clone())),
        }
    }

    /// Replace the ranking strategy
    pub fn with_scorer(mut self, scorer: impl SlotScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_conflict_rule(mut self, rule: ConflictRule) -> Self {
        self.conflict_rule = rule;
        self
    }

    pub fn with_candidate_selection(mut self, selection: CandidateSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max;
        self
    }

    /// `[preferred_date ?? now, + horizon_days)`.
    pub fn search_window(&self, request: &SuggestionRequest, now: DateTime<Utc>) -> Result<DateRange, InputError> {
        let start = request.preferred_date.unwrap_or(now);
        DateRange::new(start, checked_shift(start, days_delta(self.horizon_days)?)?)
    }

    /// `[original_start - alternatives_days, original_start + alternatives_days)`.
    pub fn alternatives_window(&self, original_start: DateTime<Utc>) -> Result<DateRange, InputError> {
        DateRange::around(original_start, self.alternatives_days)
    }

    /// Rank conflict-free windows for a new meeting.
    ///
    /// An empty list means nothing was free in the horizon; it is not an error.
    ///
    /// # Errors
    /// Returns an `InputError` for a duration outside one minute .. one week,
    /// no participants, or a horizon past the representable calendar.
    pub fn analyze_optimal_times(
        &self,
        request: &SuggestionRequest,
        now: DateTime<Utc>,
        snapshot: &SchedulingSnapshot,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<SchedulingSuggestion>, InputError> {
        let participants = request.validate()?;
        let window = self.search_window(request, now)?;
        self.suggest_in_window(
            window,
            request.duration_minutes,
            &participants,
            request.time_range,
            snapshot,
            rng,
        )
    }

    /// Rank windows within a few days either side of `original_start`.
    pub fn find_alternatives(
        &self,
        original_start: DateTime<Utc>,
        duration_minutes: i64,
        participant_ids: &[String],
        snapshot: &SchedulingSnapshot,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<SchedulingSuggestion>, InputError> {
        validate_duration(duration_minutes)?;
        let participants = normalize_participants(participant_ids)?;
        let window = self.alternatives_window(original_start)?;
        self.suggest_in_window(window, duration_minutes, &participants, None, snapshot, rng)
    }

    /// Existing meetings of `participant_ids` overlapping `[start, end)`.
    pub fn check_conflicts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        participant_ids: &[String],
        meetings: &[Meeting],
    ) -> Result<Vec<Meeting>, InputError> {
        let participants = normalize_participants(participant_ids)?;
        let range = DateRange::new(start, end)?;
        Ok(conflicting_meetings(meetings, &participants, range.start, range.end))
    }

    /// The shared pipeline: generate, resolve, select, score, rank.
    pub fn suggest_in_window(
        &self,
        window: DateRange,
        duration_minutes: i64,
        participant_ids: &[String],
        time_range: Option<DailyWindow>,
        snapshot: &SchedulingSnapshot,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<SchedulingSuggestion>, InputError> {
        let mut slots = self.generator.generate(window, duration_minutes, participant_ids)?;
        tracing::debug!(
            stage = "generating",
            count = slots.len(),
            window_start = %window.start,
            window_end = %window.end,
            "generated candidate slots"
        );

        ConflictResolver::new(&snapshot.meetings)
            .with_rule(self.conflict_rule)
            .resolve(&mut slots);

        let candidates: Vec<TimeSlot> = slots
            .into_iter()
            .filter(|slot| slot.available)
            .filter(|slot| time_range.map_or(true, |w| w.admits(slot.start, slot.end)))
            .collect();
        tracing::debug!(stage = "resolving", available = candidates.len(), "resolved conflicts");

        let index = AvailabilityIndex::new(&snapshot.availability);
        let mut suggestions: Vec<SchedulingSuggestion> = match self.selection {
            CandidateSelection::FirstGenerated => candidates
                .iter()
                .take(self.max_candidates)
                .map(|slot| self.build_suggestion(slot, &index, rng))
                .collect(),
            CandidateSelection::TopScored => {
                let mut all: Vec<SchedulingSuggestion> = candidates
                    .iter()
                    .map(|slot| self.build_suggestion(slot, &index, rng))
                    .collect();
                rank(&mut all);
                all.truncate(self.max_candidates);
                all
            }
        };

        rank(&mut suggestions);
        tracing::debug!(stage = "scoring", count = suggestions.len(), "ranked suggestions");
        Ok(suggestions)
    }

    fn build_suggestion(
        &self,
        slot: &TimeSlot,
        index: &AvailabilityIndex,
        rng: &mut dyn RngCore,
    ) -> SchedulingSuggestion {
        let score = self.scorer.score(slot, rng);
        SchedulingSuggestion {
            id: format!("suggestion-{}", slot.start.timestamp()),
            start_time: slot.start,
            end_time: slot.end,
            confidence_score: score.confidence_score,
            reasoning: score.reasoning,
            conflicts: slot.conflicts.len(),
            available_participants: index.reachable_count(&slot.participants, slot.start, slot.end),
            total_participants: slot.participants.len(),
        }
    }
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable sort, highest confidence first.
fn rank(suggestions: &mut [SchedulingSuggestion]) {
    suggestions.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{ScoringWeights, SlotScore};
    use crate::slots::MAX_DURATION_MINUTES;
    use chrono::{NaiveTime, TimeZone, Timelike};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
    }

    fn quiet_engine() -> SuggestionEngine {
        let mut config = Config::default();
        config.scoring = ScoringWeights {
            jitter: 0.0,
            ..ScoringWeights::default()
        };
        SuggestionEngine::from_config(&config)
    }

    fn flat_score(_: &TimeSlot, _: &mut dyn RngCore) -> SlotScore {
        SlotScore {
            confidence_score: 0.0,
            reasoning: "flat".to_string(),
        }
    }

    #[test]
    fn validate_normalizes_participants() {
        let request = SuggestionRequest::new(ids(&[" ana ", "bruno", "ana", ""]), 30);
        assert_eq!(request.validate().unwrap(), ids(&["ana", "bruno"]));

        let empty = SuggestionRequest::new(ids(&["  "]), 30);
        assert_eq!(empty.validate(), Err(InputError::NoParticipants));

        let zero = SuggestionRequest::new(ids(&["ana"]), 0);
        assert_eq!(zero.validate(), Err(InputError::InvalidDuration { minutes: 0 }));
    }

    #[test]
    fn search_window_defaults_to_now() {
        let engine = SuggestionEngine::new();
        let now = monday() + Duration::hours(9);
        let window = engine
            .search_window(&SuggestionRequest::new(ids(&["ana"]), 30), now)
            .unwrap();
        assert_eq!(window.start, now);
        assert_eq!(window.end, now + Duration::days(7));
    }

    #[test]
    fn caps_to_first_generated_candidates() {
        let engine = quiet_engine();
        let request = SuggestionRequest::new(ids(&["ana"]), 30).with_preferred_date(monday());
        let mut rng = Pcg64::seed_from_u64(3);

        let suggestions = engine
            .analyze_optimal_times(&request, monday(), &SchedulingSnapshot::default(), &mut rng)
            .unwrap();

        // The first ten candidates are 00:00..04:30 on Monday, before business hours
        assert_eq!(suggestions.len(), 10);
        assert!(suggestions.iter().all(|s| s.start_time.hour() < 5));
    }

    #[test]
    fn top_scored_selection_reaches_business_hours() {
        let engine = quiet_engine().with_candidate_selection(CandidateSelection::TopScored);
        let request = SuggestionRequest::new(ids(&["ana"]), 30).with_preferred_date(monday());
        let mut rng = Pcg64::seed_from_u64(3);

        let suggestions = engine
            .analyze_optimal_times(&request, monday(), &SchedulingSnapshot::default(), &mut rng)
            .unwrap();

        // Every weekday business-hour slot clamps to 100, so the earliest ones win
        assert_eq!(suggestions.len(), 10);
        assert!(suggestions.iter().all(|s| s.confidence_score == 100.0));
        assert_eq!(suggestions[0].start_time, monday() + Duration::hours(9));
        // Ties keep generation order
        assert!(suggestions.windows(2).all(|w| w[0].start_time < w[1].start_time));
    }

    #[test]
    fn time_range_filters_candidates() {
        let engine = quiet_engine();
        let window = DailyWindow::new(
            NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        )
        .unwrap();
        let request = SuggestionRequest::new(ids(&["ana"]), 60)
            .with_preferred_date(monday())
            .with_time_range(window);
        let mut rng = Pcg64::seed_from_u64(3);

        let suggestions = engine
            .analyze_optimal_times(&request, monday(), &SchedulingSnapshot::default(), &mut rng)
            .unwrap();

        assert!(!suggestions.is_empty());
        for s in &suggestions {
            assert!(window.admits(s.start_time, s.end_time));
        }
    }

    #[test]
    fn custom_scorer_keeps_generation_order_on_ties() {
        let engine = SuggestionEngine::new().with_scorer(flat_score);
        let request = SuggestionRequest::new(ids(&["ana"]), 30).with_preferred_date(monday());
        let mut rng = Pcg64::seed_from_u64(0);

        let suggestions = engine
            .analyze_optimal_times(&request, monday(), &SchedulingSnapshot::default(), &mut rng)
            .unwrap();
        let starts: Vec<_> = suggestions.iter().map(|s| s.start_time).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert!(suggestions.iter().all(|s| s.reasoning == "flat"));
    }

    #[test]
    fn available_participants_follow_preferences() {
        let engine = quiet_engine().with_candidate_selection(CandidateSelection::TopScored);
        let snapshot = SchedulingSnapshot::new(
            vec![],
            vec![AvailabilityPreference::new(
                "bruno",
                1,
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
                true,
            )],
        );
        let request = SuggestionRequest::new(ids(&["ana", "bruno"]), 30).with_preferred_date(monday());
        let mut rng = Pcg64::seed_from_u64(1);

        let suggestions = engine
            .analyze_optimal_times(&request, monday(), &snapshot, &mut rng)
            .unwrap();

        for s in &suggestions {
            assert_eq!(s.total_participants, 2);
            assert!(s.available_participants <= s.total_participants);
            let bruno_free = s.start_time == monday() + Duration::hours(10);
            assert_eq!(s.available_participants, if bruno_free { 2 } else { 1 });
        }
    }

    #[test]
    fn suggestion_ids_are_deterministic() {
        let engine = quiet_engine();
        let request = SuggestionRequest::new(ids(&["ana"]), 30).with_preferred_date(monday());
        let mut rng = Pcg64::seed_from_u64(0);
        let suggestions = engine
            .analyze_optimal_times(&request, monday(), &SchedulingSnapshot::default(), &mut rng)
            .unwrap();
        assert_eq!(suggestions[0].id, format!("suggestion-{}", suggestions[0].start_time.timestamp()));
    }

    #[test]
    fn check_conflicts_validates_range() {
        let engine = SuggestionEngine::new();
        let err = engine
            .check_conflicts(monday(), monday(), &ids(&["ana"]), &[])
            .unwrap_err();
        assert!(matches!(err, InputError::InvalidTimeRange { .. }));
    }

    #[test]
    fn snapshot_validation_flags_malformed_rows() {
        let bad = SchedulingSnapshot::new(
            vec![Meeting::new("m", "", monday(), monday() - Duration::hours(1), ids(&["ana"]))],
            vec![],
        );
        assert!(matches!(bad.validate(), Err(DataSourceError::Malformed(_))));
        assert!(SchedulingSnapshot::default().validate().is_ok());
    }

    #[test]
    fn oversized_durations_are_rejected_before_generation() {
        let engine = SuggestionEngine::new();
        let mut rng = Pcg64::seed_from_u64(0);
        for minutes in [1_000_000_000_000, i64::MAX, MAX_DURATION_MINUTES + 1] {
            let request = SuggestionRequest::new(ids(&["ana"]), minutes);
            assert_eq!(
                engine.analyze_optimal_times(&request, monday(), &SchedulingSnapshot::default(), &mut rng),
                Err(InputError::InvalidDuration { minutes })
            );
            assert_eq!(
                engine.find_alternatives(monday(), minutes, &ids(&["ana"]), &SchedulingSnapshot::default(), &mut rng),
                Err(InputError::InvalidDuration { minutes })
            );
        }
    }

    #[test]
    fn windows_past_the_calendar_limit_are_out_of_range() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        let request = SuggestionRequest::new(ids(&["ana"]), 30).with_preferred_date(late);
        assert!(matches!(
            SuggestionEngine::new().search_window(&request, monday()),
            Err(InputError::OutOfRange(_))
        ));
        assert!(matches!(
            SuggestionEngine::new().alternatives_window(late),
            Err(InputError::OutOfRange(_))
        ));

        let mut config = Config::default();
        config.search.horizon_days = i64::MAX;
        config.search.alternatives_days = i64::MAX;
        let engine = SuggestionEngine::from_config(&config);
        let plain = SuggestionRequest::new(ids(&["ana"]), 30);
        assert!(matches!(engine.search_window(&plain, monday()), Err(InputError::OutOfRange(_))));
        assert!(matches!(engine.alternatives_window(monday()), Err(InputError::OutOfRange(_))));
    }

    #[test]
    fn non_finite_jitter_from_config_is_ignored() {
        for raw in ["nan", "inf", "-inf"] {
            let config: Config = toml::from_str(&format!("[scoring]\njitter = {raw}\n")).unwrap();
            let engine = SuggestionEngine::from_config(&config);
            let request = SuggestionRequest::new(ids(&["ana"]), 30).with_preferred_date(monday());
            let mut rng = Pcg64::seed_from_u64(5);

            let suggestions = engine
                .analyze_optimal_times(&request, monday(), &SchedulingSnapshot::default(), &mut rng)
                .unwrap();
            assert!(!suggestions.is_empty());
            for s in &suggestions {
                assert!((0.0..=100.0).contains(&s.confidence_score), "{raw}: {}", s.confidence_score);
            }
        }
    }
}
