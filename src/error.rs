use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::{StorageError, UniqueConstraint},
    state::{ApplyError, PlanError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// The caller could not be identified.
    #[error("authentication required")]
    AuthenticationRequired,
    /// The caller is identified but not allowed to perform the action.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current session status.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The session has no free seat left.
    #[error("session is full ({max} participants)")]
    CapacityExceeded {
        /// Configured capacity of the session.
        max: usize,
    },
    /// The identity already joined the session.
    #[error("already joined this session")]
    AlreadyJoined,
    /// The participant already answered this question.
    #[error("answer already submitted for this question")]
    DuplicateSubmission,
    /// The answered question is not the session's current question.
    #[error("question is not the current question")]
    QuestionMismatch,
    /// The session has no questions to play.
    #[error("session has no questions")]
    NoQuestions,
    /// The session has no participants to play with.
    #[error("session has no participants")]
    NoParticipants,
    /// No playlist video produced a usable question.
    #[error("no question could be generated from the playlist")]
    NoQuestionsGenerated,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(UniqueConstraint::SessionIdentity) => ServiceError::AlreadyJoined,
            StorageError::Conflict(UniqueConstraint::QuestionParticipant) => {
                ServiceError::DuplicateSubmission
            }
            StorageError::CapacityExceeded { max } => ServiceError::CapacityExceeded { max },
            StorageError::ScoreOutOfRange { .. } => {
                ServiceError::InvalidState("participant score is out of range".into())
            }
            other => ServiceError::Unavailable(other),
        }
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
    /// Missing caller identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Caller lacks the rights for the action.
    #[error("forbidden: {0}")]
    Forbidden(String),
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
        let message = err.to_string();
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::AuthenticationRequired => AppError::Unauthorized(message),
            ServiceError::PermissionDenied(_) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidState(_)
            | ServiceError::CapacityExceeded { .. }
            | ServiceError::AlreadyJoined
            | ServiceError::DuplicateSubmission
            | ServiceError::QuestionMismatch
            | ServiceError::NoQuestions
            | ServiceError::NoParticipants
            | ServiceError::NoQuestionsGenerated => AppError::Conflict(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ServiceError::InvalidState("state transition already pending".into())
            }
            PlanError::InvalidTransition(invalid) => {
                ServiceError::InvalidState(invalid.to_string())
            }
        }
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => ServiceError::InvalidState("no transition is pending".into()),
            ApplyError::IdMismatch { .. } => {
                ServiceError::InvalidState("pending transition does not match".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn service_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(ServiceError::AuthenticationRequired),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ServiceError::PermissionDenied("host only".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ServiceError::CapacityExceeded { max: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::NotFound("session".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn unique_violations_become_domain_errors() {
        assert!(matches!(
            ServiceError::from(StorageError::Conflict(UniqueConstraint::SessionIdentity)),
            ServiceError::AlreadyJoined
        ));
        assert!(matches!(
            ServiceError::from(StorageError::Conflict(
                UniqueConstraint::QuestionParticipant
            )),
            ServiceError::DuplicateSubmission
        ));
        assert!(matches!(
            ServiceError::from(StorageError::CapacityExceeded { max: 3 }),
            ServiceError::CapacityExceeded { max: 3 }
        ));
    }
}
