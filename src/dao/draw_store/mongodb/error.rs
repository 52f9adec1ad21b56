use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

use crate::dao::models::CounterExhausted;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Server error code reported on unique index violations.
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
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
    #[error("failed to load game state")]
    LoadState {
        #[source]
        source: MongoError,
    },
    #[error("failed to save game state")]
    SaveState {
        #[source]
        source: MongoError,
    },
    #[error("failed to save draw result #{draw_number}")]
    SaveDraw {
        draw_number: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to load draw result #{draw_number}")]
    LoadDraw {
        draw_number: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to list draw results")]
    ListDraws {
        #[source]
        source: MongoError,
    },
    #[error("failed to save override for draw #{draw_number}")]
    SaveOverride {
        draw_number: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to load override for draw #{draw_number}")]
    LoadOverride {
        draw_number: u32,
        #[source]
        source: MongoError,
    },
    #[error("stored document `{id}` is malformed: {reason}")]
    Malformed { id: String, reason: &'static str },
    #[error(transparent)]
    Exhausted(#[from] CounterExhausted),
}

/// Whether `err` is a unique index violation.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
