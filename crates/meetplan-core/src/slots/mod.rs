//! Candidate time slots.
//!
//! This module provides:
//! - Fixed-step enumeration of candidate windows over a search horizon
//! - Conflict resolution of candidates against existing meetings

mod conflict;
mod generator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use conflict::{ConflictResolver, ConflictRule};
pub(crate) use generator::slot_duration;
pub use generator::{generate_time_slots, SlotGenerator, DEFAULT_STEP_MINUTES, MAX_DURATION_MINUTES};

/// A candidate meeting window under consideration.
///
/// Lives for a single suggestion computation and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub available: bool,
    /// Requested participants
    pub participants: Vec<String>,
    /// Ids of colliding meetings
    pub conflicts: Vec<String>,
}

impl TimeSlot {
    /// A fresh, not yet resolved candidate.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, participants: Vec<String>) -> Self {
        Self {
            start,
            end,
            available: true,
            participants,
            conflicts: Vec::new(),
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}
