mod config;
mod error;
mod models;
pub mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchDrawStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::CounterExhausted(exhausted) => StorageError::Exhausted(exhausted),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
