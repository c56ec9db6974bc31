use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{error::HttpError, models::jobmodel::JobStatus};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Application {0} not found")]
    ApplicationNotFound(Uuid),

    #[error("Job {0} is not in status {1:?}")]
    InvalidJobStatus(Uuid, JobStatus),

    #[error("User {0} is not authorized to perform this action on job {1}")]
    UnauthorizedJobAccess(Uuid, Uuid),

    #[error("You cannot rate yourself")]
    SelfRating,

    #[error("You have already rated this user for this job")]
    DuplicateRating,

    #[error("Invalid escrow state transition: {0}")]
    InvalidEscrowTransition(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Too many attempts: {0}")]
    TooManyAttempts(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}

impl From<String> for ServiceError {
    fn from(err: String) -> Self {
        ServiceError::Other(err)
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UserNotFound(_)
            | ServiceError::JobNotFound(_)
            | ServiceError::ApplicationNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::InvalidJobStatus(_, _)
            | ServiceError::InvalidEscrowTransition(_)
            | ServiceError::SelfRating
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::UnauthorizedJobAccess(_, _) | ServiceError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }

            ServiceError::DuplicateRating | ServiceError::Conflict(_) => StatusCode::CONFLICT,

            ServiceError::TooManyAttempts(_) => StatusCode::TOO_MANY_REQUESTS,

            ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,

            ServiceError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,

            ServiceError::Database(_) | ServiceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => HttpError::internal("service error", error),
            StatusCode::BAD_GATEWAY => {
                tracing::error!("{}", error);
                HttpError::bad_gateway(error.to_string())
            }
            StatusCode::SERVICE_UNAVAILABLE => HttpError::service_unavailable(error.to_string()),
            status => HttpError::new(error.to_string(), status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(HttpError::from(ServiceError::SelfRating).status, StatusCode::BAD_REQUEST);
        assert_eq!(HttpError::from(ServiceError::DuplicateRating).status, StatusCode::CONFLICT);
        assert_eq!(HttpError::from(ServiceError::JobNotFound(id)).status, StatusCode::NOT_FOUND);
        assert_eq!(
            HttpError::from(ServiceError::UnauthorizedJobAccess(id, id)).status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            HttpError::from(ServiceError::Upstream("timeout".into())).status,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            HttpError::from(ServiceError::NotConfigured("KYC provider")).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_database_errors_are_hidden() {
        let err = HttpError::from(ServiceError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("pool"));
    }

    #[test]
    fn test_messages_are_client_facing() {
        assert_eq!(ServiceError::SelfRating.to_string(), "You cannot rate yourself");
        assert_eq!(
            ServiceError::NotConfigured("Twilio Verify").to_string(),
            "Twilio Verify is not configured"
        );
    }
}
