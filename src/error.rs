use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use crate::store::StoreError;

/// Gateway error taxonomy
#[derive(Debug)]
pub enum GatewayError {
    /// Malformed JSON in an event's data or a topic's schema
    Decode(String),
    /// Missing or malformed client input caught before any store call
    Validation(String),
    /// Store cannot resolve a requested identifier
    NotFound(String),
    /// Opaque store failure, surfaced verbatim
    Store(String),
    /// A stored value cannot be serialized back to the wire format
    Encode(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "decode error: {}", msg),
            Self::Validation(msg) => write!(f, "validation error: {}", msg),
            Self::NotFound(msg) => write!(f, "not found: {}", msg),
            Self::Store(msg) => write!(f, "store error: {}", msg),
            Self::Encode(msg) => write!(f, "encode error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl GatewayError {
    /// Convert to a gRPC status, prefixed with the failing operation's name.
    pub fn in_operation(self, operation: &str) -> tonic::Status {
        let code = match &self {
            Self::NotFound(_) => tonic::Code::NotFound,
            Self::Decode(_) | Self::Validation(_) => tonic::Code::InvalidArgument,
            Self::Store(_) | Self::Encode(_) => tonic::Code::Internal,
        };
        tonic::Status::new(code, format!("operation {}: {}", operation, self))
    }
}

/// Form-surface errors render as a plain-text body, not JSON.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Decode(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GatewayError::NotFound("event abc".to_string());
        assert_eq!(error.to_string(), "not found: event abc");
    }

    #[test]
    fn test_operation_wrapping_keeps_cause() {
        let status =
            GatewayError::Decode("json decode of data".to_string()).in_operation("AddEvent");
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert!(status.message().contains("operation AddEvent"));
        assert!(status.message().contains("json decode of data"));
    }

    #[test]
    fn test_store_error_classification() {
        let err: GatewayError = StoreError::NotFound("topic x".to_string()).into();
        assert!(matches!(err, GatewayError::NotFound(_)));
        let err: GatewayError = StoreError::Backend("connection reset".to_string()).into();
        assert!(matches!(err, GatewayError::Store(_)));
    }

    #[tokio::test]
    async fn test_form_error_response_status() {
        let response =
            GatewayError::Validation("date cannot be empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
