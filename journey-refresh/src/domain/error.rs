//! Domain error types.
//!
//! These errors represent validation failures and data inconsistencies
//! in the domain layer. They are distinct from API/IO errors.

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    /// Journey arrives before it departs
    #[error("journey {key} arrives before it departs")]
    InvertedTimes { key: String },

    /// Journey has no legs
    #[error("journey must have at least one leg")]
    EmptyJourney,

    /// Journey key is empty
    #[error("journey key must not be empty")]
    EmptyKey,

    /// Trip context cannot be used to query the backend
    #[error("invalid trip context: {0}")]
    InvalidContext(&'static str),
}
