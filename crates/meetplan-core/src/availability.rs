//! Participant availability preferences.
//!
//! Weekly windows in which a participant is nominally reachable. Entries are
//! reference data: loaded once per request, never deduplicated, never mutated.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataSourceError;

/// A declared weekly availability window for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityPreference {
    pub participant_id: String,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub preferred: bool,
}

impl AvailabilityPreference {
    pub fn new(
        participant_id: impl Into<String>,
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
        preferred: bool,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            day_of_week,
            start_time,
            end_time,
            preferred,
        }
    }

    /// Check the entry against the model: weekday in 0..=6 and a non-empty window.
    pub fn validate(&self) -> Result<(), DataSourceError> {
        if self.day_of_week > 6 {
            return Err(DataSourceError::Malformed(format!(
                "availability for '{}' has day_of_week {} (expected 0-6)",
                self.participant_id, self.day_of_week
            )));
        }
        if self.start_time >= self.end_time {
            return Err(DataSourceError::Malformed(format!(
                "availability for '{}' ends ({}) before it starts ({})",
                self.participant_id,
                self.end_time.format("%H:%M"),
                self.start_time.format("%H:%M")
            )));
        }
        Ok(())
    }

    /// Whether `[start, end)` lies entirely inside this weekly window.
    ///
    /// Slots that cross midnight are never covered.
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if weekday_index(start) != self.day_of_week || start.date_naive() != end.date_naive() {
            return false;
        }
        start.time() >= self.start_time && end.time() <= self.end_time
    }
}

/// Day of week as 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(instant: DateTime<Utc>) -> u8 {
    instant.weekday().num_days_from_sunday() as u8
}

/// Availability entries grouped by participant for slot lookups.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    by_participant: HashMap<String, Vec<AvailabilityPreference>>,
}

impl AvailabilityIndex {
    pub fn new(preferences: &[AvailabilityPreference]) -> Self {
        let mut by_participant: HashMap<String, Vec<AvailabilityPreference>> = HashMap::new();
        for pref in preferences {
            by_participant
                .entry(pref.participant_id.clone())
                .or_default()
                .push(pref.clone());
        }
        Self { by_participant }
    }

    /// Entries declared by a participant, in input order.
    pub fn for_participant(&self, participant_id: &str) -> &[AvailabilityPreference] {
        self.by_participant
            .get(participant_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A participant with no declared windows is treated as unrestricted.
    pub fn is_reachable(&self, participant_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let prefs = self.for_participant(participant_id);
        prefs.is_empty() || prefs.iter().any(|p| p.covers(start, end))
    }

    /// Number of participants reachable for the whole of `[start, end)`.
    pub fn reachable_count(&self, participant_ids: &[String], start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        participant_ids
            .iter()
            .filter(|id| self.is_reachable(id, start, end))
            .count()
    }
}

/// `HH:mm` serde representation for wall-clock times.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Accepts `HH:mm` and `HH:mm:ss`.
    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|e| format!("invalid time '{raw}': {e}"))
    }
}
