//! Read-only collaborator stores for availability and meetings.
//!
//! The engine never talks to a store itself. [`fetch_snapshot`] issues both
//! reads concurrently, bounds each with a deadline, joins them and validates
//! the result before any slot is generated.

mod memory;
mod rest;
mod sqlite;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::availability::AvailabilityPreference;
use crate::engine::SchedulingSnapshot;
use crate::error::{DataSourceError, SchedulingError};
use crate::meeting::Meeting;
use crate::range::DateRange;

pub use memory::InMemoryStore;
pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Every availability/meeting backend implements this trait.
///
/// Implementations are read-only and must be safe to share across requests.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    /// Short identifier used in logs and errors (e.g. "sqlite", "rest").
    fn name(&self) -> &str;

    /// Availability preferences declared by any of `participant_ids`.
    async fn list_availability(
        &self,
        participant_ids: &[String],
    ) -> Result<Vec<AvailabilityPreference>, DataSourceError>;

    /// Meetings attended by any of `participant_ids` that overlap `range`.
    async fn list_meetings(
        &self,
        participant_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<Meeting>, DataSourceError>;
}

#[async_trait]
impl<S: SchedulingStore + ?Sized> SchedulingStore for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn list_availability(
        &self,
        participant_ids: &[String],
    ) -> Result<Vec<AvailabilityPreference>, DataSourceError> {
        (**self).list_availability(participant_ids).await
    }

    async fn list_meetings(
        &self,
        participant_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<Meeting>, DataSourceError> {
        (**self).list_meetings(participant_ids, range).await
    }
}

/// Fetch availability and meetings concurrently and join them.
///
/// Each read is bounded by `timeout`. Cancelling `cancel` abandons both reads.
///
/// # Errors
/// `SchedulingError::Cancelled` on cancellation, otherwise the first
/// `DataSourceError` raised by either read or by snapshot validation.
pub async fn fetch_snapshot<S>(
    store: &S,
    participant_ids: &[String],
    range: DateRange,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<SchedulingSnapshot, SchedulingError>
where
    S: SchedulingStore + ?Sized,
{
    let availability = bounded("availability", timeout, store.list_availability(participant_ids));
    let meetings = bounded("meetings", timeout, store.list_meetings(participant_ids, range));

    let joined = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(store = store.name(), "snapshot fetch cancelled");
            return Err(SchedulingError::Cancelled);
        }
        joined = async { tokio::try_join!(availability, meetings) } => joined,
    };

    let (availability, meetings) = joined.map_err(|err| {
        tracing::warn!(store = store.name(), error = %err, "snapshot fetch failed");
        err
    })?;

    let snapshot = SchedulingSnapshot::new(meetings, availability);
    snapshot.validate()?;
    tracing::debug!(
        store = store.name(),
        meetings = snapshot.meetings.len(),
        availability = snapshot.availability.len(),
        "fetched scheduling snapshot"
    );
    Ok(snapshot)
}

async fn bounded<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T, DataSourceError>
where
    F: Future<Output = Result<T, DataSourceError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DataSourceError::Timeout {
            operation: operation.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
