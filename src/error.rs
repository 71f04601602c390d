use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Errors surfaced by the session lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// Unknown session identifier
    #[error("Session {0} not found")]
    NotFound(String),

    /// Recognition engine failed to start or to accept a frame
    #[error("Recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Final artifact could not be written
    #[error("Failed to persist recording: {0}")]
    StorageWriteFailure(String),

    /// Audio codec rejected the input or was misused
    #[error("Audio encoding failed: {0}")]
    Encoding(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::StorageWriteFailure(_) | RelayError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RelayError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelayError::EngineUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RelayError::StorageWriteFailure("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = RelayError::NotFound("abc".into());
        assert_eq!(err.to_string(), "Session abc not found");
    }
}
