//! Store error types.

use thiserror::Error;

use crate::data::{DataError, Table};
use crate::generation::{GenerationError, ParseError};
use crate::models::FormError;
use crate::realtime::RealtimeError;

/// Failures surfaced by [`SyncStore`](super::SyncStore) operations.
///
/// None of these are retried; the operation that hit one leaves local state
/// as it was.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Initial or reload fetch of a table failed
    #[error("Failed to load {table}: {source}")]
    Fetch { table: Table, source: DataError },

    /// Insert, update or delete was rejected
    #[error("Failed to {action} in {table}: {source}")]
    Write {
        table: Table,
        action: &'static str,
        source: DataError,
    },

    /// A change channel could not be opened
    #[error("Failed to subscribe to {table}: {source}")]
    Subscription { table: Table, source: RealtimeError },

    #[error("{0} is already subscribed")]
    AlreadySubscribed(Table),

    #[error(transparent)]
    InvalidItem(#[from] FormError),

    /// The generation service call failed
    #[error("Recipe generation failed: {0}")]
    Generation(#[source] GenerationError),

    /// The generated text was not a usable recipe
    #[error("Generated recipe could not be parsed: {0}")]
    Parse(#[source] ParseError),

    /// Saving the generated recipe failed
    #[error("Failed to save generated recipe: {0}")]
    Persist(#[source] DataError),
}
