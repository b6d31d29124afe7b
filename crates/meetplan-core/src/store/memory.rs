//! In-memory store backed by a snapshot, optionally loaded from JSON.

use std::path::Path;

use async_trait::async_trait;

use super::SchedulingStore;
use crate::availability::AvailabilityPreference;
use crate::engine::SchedulingSnapshot;
use crate::error::DataSourceError;
use crate::meeting::Meeting;
use crate::range::DateRange;

/// Serves reads from an owned snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    snapshot: SchedulingSnapshot,
}

impl InMemoryStore {
    pub fn new(snapshot: SchedulingSnapshot) -> Self {
        Self { snapshot }
    }

    /// Parse `{ "meetings": [...], "availability": [...] }`.
    pub fn from_json_str(json: &str) -> Result<Self, DataSourceError> {
        let snapshot: SchedulingSnapshot =
            serde_json::from_str(json).map_err(|e| DataSourceError::Malformed(e.to_string()))?;
        Ok(Self::new(snapshot))
    }

    /// Load a JSON snapshot file.
    pub fn from_json_file(path: &Path) -> Result<Self, DataSourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| DataSourceError::Unreachable {
            store: "memory".to_string(),
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_json_str(&content)
    }

    pub fn snapshot(&self) -> &SchedulingSnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_availability(
        &self,
        participant_ids: &[String],
    ) -> Result<Vec<AvailabilityPreference>, DataSourceError> {
        Ok(self
            .snapshot
            .availability
            .iter()
            .filter(|p| participant_ids.contains(&p.participant_id))
            .cloned()
            .collect())
    }

    async fn list_meetings(
        &self,
        participant_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<Meeting>, DataSourceError> {
        Ok(self
            .snapshot
            .meetings
            .iter()
            .filter(|m| m.involves_any(participant_ids) && range.overlaps(m.start_time, m.end_time))
            .cloned()
            .collect())
    }
}
