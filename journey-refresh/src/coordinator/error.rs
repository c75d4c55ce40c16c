//! Coordinator error types.

use crate::domain::DomainError;
use crate::store::StoreError;

/// Errors from user actions on the coordinator.
///
/// Fetch failures are not errors here: they surface as
/// [`JourneyListState::Failed`](super::JourneyListState::Failed).
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The action needs a loaded trip
    #[error("no trip loaded")]
    NoActiveTrip,

    #[error("invalid trip: {0}")]
    InvalidContext(#[from] DomainError),

    /// Saving or reading local data failed
    #[error("storage failed: {0}")]
    Store(#[from] StoreError),
}
