// SPDX-License-Identifier: MIT OR Apache-2.0
//! REST API error types.

use aura_progression::{ProgressionError, StoreError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error status string.
    pub status: String,
    /// Error code.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

impl ApiError {
    /// Create a new API error.
    #[must_use]
    pub fn new(status: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", 400, message)
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", 404, message)
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", 409, message)
    }

    /// Create an internal server error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", 500, message)
    }

    /// Create a service unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("unavailable", 503, message)
    }
}

impl From<ProgressionError> for ApiError {
    fn from(err: ProgressionError) -> Self {
        match &err {
            ProgressionError::InvalidAmount(_)
            | ProgressionError::InvalidQuest(_)
            | ProgressionError::QuestNotCompleted(_) => Self::bad_request(err.to_string()),
            ProgressionError::QuestNotFound(_)
            | ProgressionError::UserNotFound(_)
            | ProgressionError::AchievementNotFound(_) => Self::not_found(err.to_string()),
            ProgressionError::AlreadyClaimed(_)
            | ProgressionError::AchievementAlreadyUnlocked { .. }
            | ProgressionError::UserExists(_) => Self::conflict(err.to_string()),
            ProgressionError::Storage(StoreError::Unavailable(_)) => {
                tracing::warn!(error = %err, "store unavailable");
                Self::unavailable("progression store unavailable")
            },
            _ => {
                tracing::error!(error = %err, "progression request failed");
                Self::internal("internal progression error")
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.code {
            400 => StatusCode::BAD_REQUEST,
            404 => StatusCode::NOT_FOUND,
            409 => StatusCode::CONFLICT,
            503 => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Result type for REST API handlers.
pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[cfg(test)]
mod tests {
    use aura_progression::{QuestId, UserId};

    use super::*;

    #[test]
    fn test_api_error_constructors() {
        assert_eq!(ApiError::bad_request("x").code, 400);
        assert_eq!(ApiError::not_found("x").status, "not_found");
        assert_eq!(ApiError::conflict("x").code, 409);
        assert_eq!(ApiError::internal("x").status, "internal_error");
        assert_eq!(ApiError::unavailable("x").code, 503);
    }

    #[test]
    fn test_caller_errors_map_to_client_statuses() {
        let quest = QuestId::new();
        let cases = [
            (ProgressionError::InvalidAmount("zero".into()), 400),
            (ProgressionError::QuestNotCompleted(quest), 400),
            (ProgressionError::QuestNotFound(quest), 404),
            (ProgressionError::UserNotFound(UserId::new("u")), 404),
            (ProgressionError::AchievementNotFound("a".into()), 404),
            (ProgressionError::AlreadyClaimed(quest), 409),
            (ProgressionError::UserExists(UserId::new("u")), 409),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code, code);
        }
    }

    #[test]
    fn test_system_errors_hide_details() {
        let err = ApiError::from(ProgressionError::InconsistentLedger {
            user_id: UserId::new("u"),
            ledger_total: 10,
            stored_total: 5,
        });
        assert_eq!(err.code, 500);
        assert!(!err.message.contains("ledger total"));

        let err = ApiError::from(ProgressionError::Storage(StoreError::Unavailable(
            "down".into(),
        )));
        assert_eq!(err.code, 503);
    }

    #[test]
    fn test_api_error_serialization() {
        let json = serde_json::to_string(&ApiError::bad_request("test")).unwrap();
        assert!(json.contains("bad_request"));
        assert!(json.contains("400"));
    }
}
