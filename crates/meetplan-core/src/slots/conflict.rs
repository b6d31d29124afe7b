//! Marks candidate slots that collide with existing meetings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TimeSlot;
use crate::meeting::Meeting;

/// How a candidate slot is tested against an existing meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictRule {
    /// Blocked only when the slot's start lies in `[m.start, m.end)` or its end
    /// lies in `(m.start, m.end]`. A meeting fully inside a longer slot is not
    /// detected.
    Endpoint,
    /// Blocked when `slot.start < m.end && slot.end > m.start`.
    #[default]
    Overlap,
}

impl ConflictRule {
    pub fn collides(&self, meeting: &Meeting, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match self {
            Self::Endpoint => meeting.contains_start(start) || meeting.contains_end(end),
            Self::Overlap => meeting.overlaps(start, end),
        }
    }
}

/// Resolves slot availability against a borrowed set of meetings.
pub struct ConflictResolver<'a> {
    meetings: &'a [Meeting],
    rule: ConflictRule,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(meetings: &'a [Meeting]) -> Self {
        Self {
            meetings,
            rule: ConflictRule::default(),
        }
    }

    pub fn with_rule(mut self, rule: ConflictRule) -> Self {
        self.rule = rule;
        self
    }

    /// Ids of meetings colliding with `slot`, in meeting order.
    ///
    /// Only meetings attended by one of the slot's participants count.
    pub fn conflicts_for(&self, slot: &TimeSlot) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for meeting in self.meetings {
            if !meeting.involves_any(&slot.participants) {
                continue;
            }
            if self.rule.collides(meeting, slot.start, slot.end) && !ids.contains(&meeting.id) {
                ids.push(meeting.id.clone());
            }
        }
        ids
    }

    /// Set `available` and `conflicts` on every slot.
    pub fn resolve(&self, slots: &mut [TimeSlot]) {
        for slot in slots.iter_mut() {
            slot.conflicts = self.conflicts_for(slot);
            slot.available = slot.conflicts.is_empty();
        }
    }
}
