use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::wheel::InvalidNumber};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client. Nothing was written.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The game state singleton has not been seeded yet.
    #[error("game state not initialized")]
    NotInitialized,
    /// A result already exists for this draw; history is append-only.
    #[error("draw {draw_number} has already been recorded")]
    DuplicateDraw { draw_number: u32 },
    /// Another writer changed the record first.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Storage returned a record that violates a domain invariant.
    #[error("corrupted record: {0}")]
    Corrupted(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Exhausted(exhausted) => ServiceError::InvalidState(exhausted.to_string()),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<InvalidNumber> for ServiceError {
    fn from(err: InvalidNumber) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) | ServiceError::Conflict(message) => {
                AppError::Conflict(message)
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            err @ (ServiceError::NotInitialized | ServiceError::DuplicateDraw { .. }) => {
                AppError::Conflict(err.to_string())
            }
            ServiceError::Corrupted(message) => AppError::Internal(message),
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            success: false,
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::CounterExhausted;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotInitialized, StatusCode::CONFLICT),
            (
                ServiceError::DuplicateDraw { draw_number: 5 },
                StatusCode::CONFLICT,
            ),
            (ServiceError::Conflict("lost".into()), StatusCode::CONFLICT),
            (ServiceError::NotFound("draw 3".into()), StatusCode::NOT_FOUND),
            (ServiceError::Degraded, StatusCode::SERVICE_UNAVAILABLE),
            (
                ServiceError::Unauthorized("nope".into()),
                StatusCode::UNAUTHORIZED,
            ),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn invalid_number_is_a_validation_failure() {
        let err = ServiceError::from(InvalidNumber(37));
        assert!(matches!(err, ServiceError::InvalidInput(message) if message.contains("37")));
    }

    #[test]
    fn exhausted_counter_is_an_invalid_state() {
        let err = ServiceError::from(StorageError::from(CounterExhausted {
            current_draw_number: u32::MAX - 1,
        }));
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
