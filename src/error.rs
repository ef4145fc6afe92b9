use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Annotation stage could not complete (bad input, detector fault)
    #[error("Detection failed: {0}")]
    DetectionFailure(String),

    /// Control message or request targets an absent/expired session
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session establishment failed (offer rejected, peer setup failed)
    #[error("Negotiation failed: {0}")]
    NegotiationFailure(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Video error: {0}")]
    VideoError(String),

    #[error("WebRTC error: {0}")]
    WebRtcError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Error response body (unified success format)
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        // Always return 200 OK - success/failure is indicated by the success field
        StatusCode::OK
    }

    /// Short machine-readable kind, used in control channel error replies
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DetectionFailure(_) => "detection_failure",
            AppError::SessionNotFound(_) => "session_not_found",
            AppError::NegotiationFailure(_) => "negotiation_failure",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Serialization(_) => "serialization",
            AppError::VideoError(_) => "video",
            AppError::WebRtcError(_) => "webrtc",
            AppError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            message: self.to_string(),
        };

        tracing::error!(
            error_kind = self.kind(),
            error_message = %body.message,
            "Request failed"
        );

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_message() {
        let err = AppError::SessionNotFound("abc".to_string());
        assert_eq!(err.kind(), "session_not_found");
        assert_eq!(err.to_string(), "Session not found: abc");

        let err = AppError::NegotiationFailure("bad sdp".to_string());
        assert_eq!(err.kind(), "negotiation_failure");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
    }
}
