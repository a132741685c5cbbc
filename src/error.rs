//! Error types for chat-relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for chat-relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors the relay surfaces to its callers.
///
/// Upstream failures are not represented here. They are absorbed into a
/// fallback `reply` and never reach the client as an `error` body.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    BadRequest(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_method_not_allowed_response() {
        let response = Error::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Method Not Allowed");
    }

    #[tokio::test]
    async fn test_bad_request_response_is_flat_error() {
        let response = Error::BadRequest("Message cannot be empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({ "error": "Message cannot be empty" }));
    }
}
