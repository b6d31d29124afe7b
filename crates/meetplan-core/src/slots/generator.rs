//! Fixed-step candidate enumeration.
//!
//! Candidates start on a grid anchored at the top of the hour containing the
//! horizon start, so a 60 minute meeting gets candidates at :00 and :30 of
//! every hour with the default step. Callers needing finer granularity must
//! filter before or after.

use chrono::{DateTime, Duration, Timelike, Utc};

use super::TimeSlot;
use crate::error::InputError;
use crate::range::{checked_shift, DateRange};

/// Default distance between consecutive candidate starts.
pub const DEFAULT_STEP_MINUTES: i64 = 30;

/// Longest meeting a slot may describe: one week.
pub const MAX_DURATION_MINUTES: i64 = 7 * 24 * 60;

/// Validated slot length in `1..=MAX_DURATION_MINUTES` minutes.
pub(crate) fn slot_duration(minutes: i64) -> Result<Duration, InputError> {
    if !(1..=MAX_DURATION_MINUTES).contains(&minutes) {
        return Err(InputError::InvalidDuration { minutes });
    }
    Ok(Duration::minutes(minutes))
}

/// Enumerates fixed-duration candidate windows across a horizon.
#[derive(Debug, Clone, Copy)]
pub struct SlotGenerator {
    step_minutes: i64,
}

impl SlotGenerator {
    /// Create a generator with the default 30 minute step
    pub fn new() -> Self {
        Self {
            step_minutes: DEFAULT_STEP_MINUTES,
        }
    }

    /// Set the step between candidate starts, clamped to one minute .. one week
    pub fn with_step(mut self, minutes: i64) -> Self {
        self.step_minutes = minutes.clamp(1, MAX_DURATION_MINUTES);
        self
    }

    pub fn step_minutes(&self) -> i64 {
        self.step_minutes
    }

    /// Generate candidates whose start lies in `[range.start, range.end)`.
    ///
    /// # Errors
    /// Returns `InputError::InvalidDuration` when `duration_minutes` is outside
    /// `1..=MAX_DURATION_MINUTES`, and `InputError::OutOfRange` when a slot
    /// would end past the last representable instant.
    pub fn generate(
        &self,
        range: DateRange,
        duration_minutes: i64,
        participant_ids: &[String],
    ) -> Result<Vec<TimeSlot>, InputError> {
        let duration = slot_duration(duration_minutes)?;
        let step = Duration::minutes(self.step_minutes);
        let mut slots = Vec::new();
        let mut current = top_of_hour(range.start);

        while current < range.end {
            // Grid points before the horizon start belong to the truncated hour
            if current >= range.start {
                let end = checked_shift(current, duration)?;
                slots.push(TimeSlot::new(current, end, participant_ids.to_vec()));
            }
            current = match current.checked_add_signed(step) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(slots)
    }
}

impl Default for SlotGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to generate slots with the default step
pub fn generate_time_slots(
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    duration_minutes: i64,
    participant_ids: &[String],
) -> Result<Vec<TimeSlot>, InputError> {
    let range = DateRange::new(start_date, end_date)?;
    SlotGenerator::new().generate(range, duration_minutes, participant_ids)
}

fn top_of_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}
