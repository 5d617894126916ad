// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::db::DbPoolError;

/// Error taxonomy surfaced by the API.
///
/// Every variant maps to a distinguishable status code and a
/// human-readable message; none are retried automatically.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] DbPoolError),
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            // Unique violations back up the logical duplicate pre-checks
            // (likes, follows, username/email).
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => ApiError::Conflict(info.message().to_string()),
            other => ApiError::Database(other),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::Database(_) | ApiError::Pool(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Internal details go to the log, not the client.
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Pool(e) => {
                error!("Connection pool error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Internal(e) => {
                error!("Internal error: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(json!({
                "error": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_distinct_statuses() {
        assert_eq!(
            ApiError::NotFound("post not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("already liked".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::InvalidRequest("cannot follow yourself".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidState("not liked yet".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn unique_violations_become_conflicts() {
        let err = ApiError::from(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        ));
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn other_database_errors_stay_internal() {
        let err = ApiError::from(diesel::result::Error::NotFound);
        assert!(matches!(err, ApiError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
