//! Half-open instant ranges and daily wall-clock windows.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::hhmm;
use crate::error::InputError;

/// A half-open range `[start, end)` of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create a range, rejecting empty or inverted bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InputError> {
        if start >= end {
            return Err(InputError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Symmetric range of `days` around `center`.
    pub fn around(center: DateTime<Utc>, days: i64) -> Result<Self, InputError> {
        let delta = days_delta(days)?;
        Self::new(checked_shift(center, -delta)?, checked_shift(center, delta)?)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Same start, end pushed out by `extra`.
    pub fn extended_by(&self, extra: Duration) -> Result<Self, InputError> {
        Ok(Self {
            start: self.start,
            end: checked_shift(self.end, extra)?,
        })
    }
}

/// `instant + delta`, failing instead of overflowing chrono's calendar.
pub(crate) fn checked_shift(instant: DateTime<Utc>, delta: Duration) -> Result<DateTime<Utc>, InputError> {
    instant
        .checked_add_signed(delta)
        .ok_or_else(|| InputError::OutOfRange(format!("{} shifted by {delta}", instant.to_rfc3339())))
}

pub(crate) fn days_delta(days: i64) -> Result<Duration, InputError> {
    Duration::try_days(days).ok_or_else(|| InputError::OutOfRange(format!("{days} days")))
}

/// A wall-clock window applied to every day of the horizon, e.g. `09:00-17:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl DailyWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, InputError> {
        if start >= end {
            return Err(InputError::InvalidWindow(format!(
                "{} is not before {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `HH:mm-HH:mm`.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let (start, end) = raw
            .split_once('-')
            .ok_or_else(|| InputError::InvalidWindow(format!("expected HH:mm-HH:mm, got '{raw}'")))?;
        let start = hhmm::parse(start.trim()).map_err(InputError::InvalidWindow)?;
        let end = hhmm::parse(end.trim()).map_err(InputError::InvalidWindow)?;
        Self::new(start, end)
    }

    /// The slot must start and end on the same day, inside the window.
    pub fn admits(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start.date_naive() == end.date_naive() && start.time() >= self.start && end.time() <= self.end
    }
}
