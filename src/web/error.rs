//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_id: Option<i64>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    log_id: Option<i64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            log_id: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attach the post log row the failure was recorded in.
    pub fn with_log_id(mut self, log_id: i64) -> Self {
        self.log_id = Some(log_id);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            log_id: self.log_id,
        };
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match &err {
            AppError::NotFound(_) => ApiError::not_found(err.to_string()),
            AppError::Validation(msg) => ApiError::bad_request(msg.clone()),
            AppError::Conflict(msg) => ApiError::new(StatusCode::CONFLICT, msg.clone()),
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                ApiError::internal(msg.clone())
            }
            AppError::Database(_) | AppError::Connection(_) | AppError::Io(_) => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
            _ => {
                tracing::error!("Request failed: {}", err);
                ApiError::internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_mapping() {
        let cases = [
            (AppError::NotFound("Article 1".to_string()), StatusCode::NOT_FOUND),
            (AppError::Validation("bad".to_string()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("dup".to_string()), StatusCode::CONFLICT),
            (AppError::Config("missing".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Relay("down".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_storage_errors_are_not_leaked() {
        let err = ApiError::from(AppError::Io(std::io::Error::other("disk path /var/x")));
        assert_eq!(err.message, "An internal error occurred");
    }

    #[test]
    fn test_log_id_attached() {
        let err = ApiError::internal("relay failed").with_log_id(7);
        assert_eq!(err.log_id, Some(7));
        assert_eq!(err.to_string(), "500 Internal Server Error: relay failed");
    }
}
