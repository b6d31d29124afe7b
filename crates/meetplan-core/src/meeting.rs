//! Existing commitments read from the meeting store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataSourceError;

/// A meeting already on participants' calendars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub participants: Vec<String>,
}

impl Meeting {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        participants: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start_time,
            end_time,
            participants,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Whether any of `participant_ids` attends this meeting.
    pub fn involves_any(&self, participant_ids: &[String]) -> bool {
        self.participants.iter().any(|p| participant_ids.contains(p))
    }

    /// Full interval intersection with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end_time && end > self.start_time
    }

    /// `instant` in `[start_time, end_time)`.
    pub fn contains_start(&self, instant: DateTime<Utc>) -> bool {
        self.start_time <= instant && instant < self.end_time
    }

    /// `instant` in `(start_time, end_time]`.
    pub fn contains_end(&self, instant: DateTime<Utc>) -> bool {
        self.start_time < instant && instant <= self.end_time
    }

    pub fn validate(&self) -> Result<(), DataSourceError> {
        if self.end_time <= self.start_time {
            return Err(DataSourceError::Malformed(format!(
                "meeting '{}' ends at {} which is not after its start {}",
                self.id,
                self.end_time.to_rfc3339(),
                self.start_time.to_rfc3339()
            )));
        }
        Ok(())
    }
}

/// Meetings involving any of `participant_ids` that overlap `[start, end)`.
///
/// Input order is preserved.
pub fn conflicting_meetings(
    meetings: &[Meeting],
    participant_ids: &[String],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Meeting> {
    meetings
        .iter()
        .filter(|m| m.involves_any(participant_ids) && m.overlaps(start, end))
        .cloned()
        .collect()
}
