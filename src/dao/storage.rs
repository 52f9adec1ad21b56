use std::error::Error;
use thiserror::Error;

use crate::dao::models::CounterExhausted;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A write collided with an existing record sharing the same unique key.
    #[error("duplicate {collection} record for key `{key}`")]
    Duplicate {
        collection: &'static str,
        key: String,
    },
    /// The game state reached the largest representable draw number.
    #[error(transparent)]
    Exhausted(#[from] CounterExhausted),
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a uniqueness violation for `collection` on `key`.
    pub fn duplicate(collection: &'static str, key: impl ToString) -> Self {
        StorageError::Duplicate {
            collection,
            key: key.to_string(),
        }
    }
}
