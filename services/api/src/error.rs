//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::{StoreError, StoreErrorKind};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{auth::AuthError, cascade::PurgeError, service::ServiceError};

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    /// The request clashes with the current state
    #[error("{0}")]
    Conflict(String),

    /// The store is temporarily unavailable
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e.kind() {
            StoreErrorKind::NotFound => {
                warn!("Document vanished during the request: {}", e);
                ApiError::NotFound("The requested document no longer exists.".to_string())
            }
            StoreErrorKind::Conflict => {
                warn!("Write conflict: {}", e);
                ApiError::Conflict("The change conflicts with existing data.".to_string())
            }
            StoreErrorKind::Transient => {
                error!("Store unavailable: {}", e);
                ApiError::ServiceUnavailable
            }
            StoreErrorKind::Malformed | StoreErrorKind::Permanent => {
                error!("Store failure: {}", e);
                ApiError::InternalServerError
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Hashing(_) | AuthError::Issuing(_) => {
                error!("Auth failure: {}", e);
                ApiError::InternalServerError
            }
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<PurgeError> for ApiError {
    fn from(e: PurgeError) -> Self {
        match e {
            PurgeError::Missing { kind, .. } => ApiError::NotFound(format!("{} not found.", kind)),
            PurgeError::Store(e) => e.into(),
            other => ApiError::Conflict(other.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(_) => ApiError::NotFound(e.to_string()),
            ServiceError::Forbidden(message) => ApiError::Forbidden(message),
            ServiceError::Invalid(message) => ApiError::BadRequest(message),
            ServiceError::Conflict(message) => ApiError::Conflict(message),
            ServiceError::Unauthorized(message) => ApiError::Unauthorized(message),
            ServiceError::Purge(e) => e.into(),
            ServiceError::Store(e) => e.into(),
            ServiceError::Auth(e) => e.into(),
            ServiceError::Diff(e) => {
                error!("Failed to compare documents: {}", e);
                ApiError::InternalServerError
            }
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(e: impl Into<ApiError>) -> StatusCode {
        e.into().status()
    }

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(status(ServiceError::NotFound("Stash")), StatusCode::NOT_FOUND);
        assert_eq!(status(ServiceError::forbidden("no")), StatusCode::FORBIDDEN);
        assert_eq!(status(ServiceError::invalid("bad")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ServiceError::Conflict("taken".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(ServiceError::Unauthorized("who".into())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn purge_preconditions_are_conflicts() {
        let e = PurgeError::LabelHasItems {
            label_id: "l1".into(),
            count: 2,
        };
        assert_eq!(status(ServiceError::from(e)), StatusCode::CONFLICT);

        let missing = PurgeError::Missing {
            kind: "Storage",
            id: "s1".into(),
        };
        let api: ApiError = missing.into();
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
        assert_eq!(api.to_string(), "Storage not found.");
    }

    #[test]
    fn store_errors_follow_their_kind() {
        assert_eq!(
            status(StoreError::Transient("timeout".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(StoreError::Permanent("denied".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(StoreError::already_exists("items", "i1")),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn token_errors_are_unauthorized() {
        assert_eq!(status(AuthError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(AuthError::Hashing("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
