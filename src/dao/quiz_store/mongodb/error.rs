use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

use crate::dao::storage::UniqueConstraint;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("duplicate key on `{collection}`")]
    Duplicate {
        collection: &'static str,
        constraint: UniqueConstraint,
    },
    #[error("session capacity of {max} participants reached")]
    Capacity { max: usize },
    #[error("MongoDB operation `{operation}` failed on `{collection}`")]
    Operation {
        operation: &'static str,
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("stored document in `{collection}` is malformed: {reason}")]
    Malformed {
        collection: &'static str,
        reason: String,
    },
}

impl MongoDaoError {
    pub fn operation(
        operation: &'static str,
        collection: &'static str,
    ) -> impl FnOnce(MongoError) -> Self {
        move |source| MongoDaoError::Operation {
            operation,
            collection,
            source,
        }
    }

    /// Map a write error, turning duplicate-key failures into [`MongoDaoError::Duplicate`].
    pub fn write(
        operation: &'static str,
        collection: &'static str,
        constraint: UniqueConstraint,
    ) -> impl FnOnce(MongoError) -> Self {
        move |source| {
            if is_duplicate_key(&source) {
                MongoDaoError::Duplicate {
                    collection,
                    constraint,
                }
            } else {
                MongoDaoError::Operation {
                    operation,
                    collection,
                    source,
                }
            }
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}
