use std::error::Error;

use thiserror::Error;
use uuid::Uuid;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Unique constraint that rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    /// Room codes are unique across sessions.
    RoomCode,
    /// A given identity joins a session at most once.
    SessionIdentity,
    /// A participant answers a given question at most once.
    QuestionParticipant,
}

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A unique constraint rejected the write; the first writer won.
    #[error("unique constraint violated: {0:?}")]
    Conflict(UniqueConstraint),
    /// The session is already at capacity.
    #[error("session capacity of {max} participants reached")]
    CapacityExceeded { max: usize },
    /// Applying the score delta would leave the `i32` range.
    #[error("score of participant `{participant_id}` would overflow")]
    ScoreOutOfRange { participant_id: Uuid },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
