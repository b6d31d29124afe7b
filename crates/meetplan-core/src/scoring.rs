//! Slot scoring.
//!
//! Scoring is a strategy: anything implementing [`SlotScorer`] (including a
//! plain closure) can rank slots. The default [`HeuristicScorer`] adds fixed
//! bonuses and penalties to a base score:
//!
//! - Business hours (start hour in 9..=17): +30
//! - Weekday (Monday-Friday): +20
//! - Mid-morning (10:00-11:59 start): +15
//! - Early afternoon (14:00-15:59 start): +10
//! - Outside working hours (start before 8:00 or after 18:59): -20
//! - Symmetric random jitter in [-5, +5] drawn from the caller's RNG
//!
//! The result is clamped to 0-100. Scoring never fails.

use chrono::{Datelike, Timelike, Weekday};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::slots::TimeSlot;

/// Score and human-readable justification for one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotScore {
    pub confidence_score: f64,
    pub reasoning: String,
}

/// Ranking strategy for available slots.
pub trait SlotScorer: Send + Sync {
    /// Score a slot. Randomness must come from `rng` only.
    fn score(&self, slot: &TimeSlot, rng: &mut dyn RngCore) -> SlotScore;
}

impl<F> SlotScorer for F
where
    F: Fn(&TimeSlot, &mut dyn RngCore) -> SlotScore + Send + Sync,
{
    fn score(&self, slot: &TimeSlot, rng: &mut dyn RngCore) -> SlotScore {
        self(slot, rng)
    }
}

pub const CLAUSE_BUSINESS_HOURS: &str = "business hours";
pub const CLAUSE_WEEKDAY: &str = "weekday";
pub const CLAUSE_MID_MORNING: &str = "mid-morning";
pub const CLAUSE_EARLY_AFTERNOON: &str = "early afternoon";
pub const CLAUSE_OFF_HOURS: &str = "outside working hours";
pub const CLAUSE_SMALL_MEETING: &str = "small meeting";
const CLAUSE_FALLBACK: &str = "available slot";

/// Heuristic weights and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_base")]
    pub base: f64,
    /// First business hour (inclusive)
    #[serde(default = "default_business_start")]
    pub business_start_hour: u32,
    /// Last business hour (inclusive)
    #[serde(default = "default_business_end")]
    pub business_end_hour: u32,
    #[serde(default = "default_business_bonus")]
    pub business_hours_bonus: f64,
    #[serde(default = "default_weekday_bonus")]
    pub weekday_bonus: f64,
    #[serde(default = "default_mid_morning_bonus")]
    pub mid_morning_bonus: f64,
    #[serde(default = "default_early_afternoon_bonus")]
    pub early_afternoon_bonus: f64,
    /// Subtracted when the start hour is before `early_cutoff_hour` or after `late_cutoff_hour`
    #[serde(default = "default_off_hours_penalty")]
    pub off_hours_penalty: f64,
    #[serde(default = "default_early_cutoff")]
    pub early_cutoff_hour: u32,
    #[serde(default = "default_late_cutoff")]
    pub late_cutoff_hour: u32,
    /// Jitter amplitude; 0 disables jitter
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    /// Meetings with at most this many participants get the small meeting clause
    #[serde(default = "default_small_meeting_max")]
    pub small_meeting_max: usize,
}

fn default_base() -> f64 {
    50.0
}
fn default_business_start() -> u32 {
    9
}
fn default_business_end() -> u32 {
    17
}
fn default_business_bonus() -> f64 {
    30.0
}
fn default_weekday_bonus() -> f64 {
    20.0
}
fn default_mid_morning_bonus() -> f64 {
    15.0
}
fn default_early_afternoon_bonus() -> f64 {
    10.0
}
fn default_off_hours_penalty() -> f64 {
    20.0
}
fn default_early_cutoff() -> u32 {
    8
}
fn default_late_cutoff() -> u32 {
    18
}
fn default_jitter() -> f64 {
    5.0
}
fn default_small_meeting_max() -> usize {
    3
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: default_base(),
            business_start_hour: default_business_start(),
            business_end_hour: default_business_end(),
            business_hours_bonus: default_business_bonus(),
            weekday_bonus: default_weekday_bonus(),
            mid_morning_bonus: default_mid_morning_bonus(),
            early_afternoon_bonus: default_early_afternoon_bonus(),
            off_hours_penalty: default_off_hours_penalty(),
            early_cutoff_hour: default_early_cutoff(),
            late_cutoff_hour: default_late_cutoff(),
            jitter: default_jitter(),
            small_meeting_max: default_small_meeting_max(),
        }
    }
}

/// Default business-hours scorer.
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    weights: ScoringWeights,
}

impl HeuristicScorer {
    /// Create a scorer with default weights
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom weights
    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Deterministic part of the score plus the clauses that fired.
    pub fn heuristic_score(&self, slot: &TimeSlot) -> (f64, Vec<&'static str>) {
        let w = &self.weights;
        let hour = slot.start.hour();
        let mut score = w.base;
        let mut clauses = Vec::new();

        if (w.business_start_hour..=w.business_end_hour).contains(&hour) {
            score += w.business_hours_bonus;
            clauses.push(CLAUSE_BUSINESS_HOURS);
        }

        if !matches!(slot.start.weekday(), Weekday::Sat | Weekday::Sun) {
            score += w.weekday_bonus;
            clauses.push(CLAUSE_WEEKDAY);
        }

        if hour == 10 || hour == 11 {
            score += w.mid_morning_bonus;
            clauses.push(CLAUSE_MID_MORNING);
        }

        if hour == 14 || hour == 15 {
            score += w.early_afternoon_bonus;
            clauses.push(CLAUSE_EARLY_AFTERNOON);
        }

        if hour < w.early_cutoff_hour || hour > w.late_cutoff_hour {
            score -= w.off_hours_penalty;
            clauses.push(CLAUSE_OFF_HOURS);
        }

        (score, clauses)
    }

    fn jitter(&self, rng: &mut dyn RngCore) -> f64 {
        let amplitude = self.weights.jitter.abs();
        // NaN or infinite amplitudes cannot bound a range
        if amplitude == 0.0 || !amplitude.is_finite() {
            return 0.0;
        }
        rng.gen_range(-amplitude..=amplitude)
    }
}

impl SlotScorer for HeuristicScorer {
    fn score(&self, slot: &TimeSlot, rng: &mut dyn RngCore) -> SlotScore {
        let (score, mut clauses) = self.heuristic_score(slot);
        let jittered = score + self.jitter(rng);

        if slot.participants.len() <= self.weights.small_meeting_max {
            clauses.push(CLAUSE_SMALL_MEETING);
        }

        let reasoning = if clauses.is_empty() {
            CLAUSE_FALLBACK.to_string()
        } else {
            clauses.join(", ")
        };

        SlotScore {
            confidence_score: clamp_score(jittered),
            reasoning,
        }
    }
}

/// Clamp to the 0-100 confidence range.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}
