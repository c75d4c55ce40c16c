//! Trip store error types.

/// Errors that can occur when reading or writing the trip store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("store I/O error: {message}")]
    Io { message: String },

    /// Stored data could not be (de)serialized
    #[error("store serialization error: {message}")]
    Serialization { message: String },
}
