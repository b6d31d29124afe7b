//! # Meetplan Core Library
//!
//! Suggests times for a new meeting from participants' existing meetings and
//! declared availability. The CLI and any other front end are thin layers
//! over this crate.
//!
//! ## Architecture
//!
//! - **Slots**: candidate windows on a fixed grid and conflict detection
//!   against existing meetings
//! - **Scoring**: pluggable heuristic that turns a free slot into a
//!   confidence score and a human-readable reasoning string
//! - **Engine**: pure pipeline over a fetched snapshot
//! - **Stores**: read-only backends (JSON snapshot, SQLite, REST) plus a
//!   concurrent, deadline-bounded fetch
//! - **Service**: async wrapper tying a store to the engine
//!
//! ## Key Components
//!
//! - [`SuggestionEngine`]: generation, resolution, scoring and ranking
//! - [`SchedulingService`]: fetch then suggest, with timeout and cancellation
//! - [`SchedulingStore`]: trait every backend implements
//! - [`Config`]: TOML configuration

pub mod availability;
pub mod engine;
pub mod error;
pub mod meeting;
pub mod range;
pub mod scoring;
pub mod service;
pub mod slots;
pub mod storage;
pub mod store;

pub use availability::{AvailabilityIndex, AvailabilityPreference};
pub use engine::{
    CandidateSelection, SchedulingSnapshot, SchedulingSuggestion, SuggestionEngine,
    SuggestionRequest,
};
pub use error::{ConfigError, DataSourceError, InputError, SchedulingError};
pub use meeting::{conflicting_meetings, Meeting};
pub use range::{DailyWindow, DateRange};
pub use scoring::{HeuristicScorer, ScoringWeights, SlotScore, SlotScorer};
pub use service::SchedulingService;
pub use slots::{
    generate_time_slots, ConflictResolver, ConflictRule, SlotGenerator, TimeSlot, MAX_DURATION_MINUTES,
};
pub use storage::{data_dir, Config};
pub use store::{fetch_snapshot, InMemoryStore, RestStore, SchedulingStore, SqliteStore};

pub use tokio_util::sync::CancellationToken;
