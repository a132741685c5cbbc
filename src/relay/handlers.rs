//! HTTP request handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use super::server::{AppState, RequestId};
use super::types::{GenerateContentRequest, RelayRequest, RelayResponse};
use crate::error::Error;

/// Reply sent when the upstream answers with a non-success status.
pub const UPSTREAM_ERROR_REPLY: &str = "The AI service failed to respond.";
/// Reply sent when the upstream cannot be reached or its answer cannot be read.
pub const UPSTREAM_UNREACHABLE_REPLY: &str = "Could not connect to the AI service.";
/// Reply sent when the upstream succeeds but produces no text.
pub const NO_RESPONSE_REPLY: &str = "No response from the AI service.";

/// Why an upstream call did not produce a reply.
///
/// Only ever logged; the client sees a fixed fallback reply instead.
#[derive(Debug, thiserror::Error)]
enum UpstreamFailure {
    #[error("upstream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to reach upstream: {0}")]
    Transport(String),

    #[error("failed to parse upstream response: {0}")]
    Decode(String),
}

impl UpstreamFailure {
    fn fallback_reply(&self) -> &'static str {
        match self {
            UpstreamFailure::Status { .. } => UPSTREAM_ERROR_REPLY,
            UpstreamFailure::Transport(_) | UpstreamFailure::Decode(_) => {
                UPSTREAM_UNREACHABLE_REPLY
            }
        }
    }
}

/// Extract the generated text from a `generateContent` response.
///
/// Reads only `candidates[0].content.parts[0].text`. Returns None if any
/// step of the path is missing or the text is empty.
fn extract_reply(response: &serde_json::Value) -> Option<&str> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .filter(|text| !text.is_empty())
}

/// Handle POST on the relay path.
pub async fn relay_chat(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: std::result::Result<Json<RelayRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RelayResponse>), Error> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(
            request_id = %request_id.0,
            error = %rejection.body_text(),
            "Rejected malformed relay request"
        );
        Error::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    if request.message.trim().is_empty() {
        tracing::warn!(request_id = %request_id.0, "Rejected relay request with empty message");
        return Err(Error::BadRequest("Message cannot be empty".to_string()));
    }

    tracing::info!(
        request_id = %request_id.0,
        message_chars = request.message.chars().count(),
        "Received relay request"
    );

    match call_upstream(&state, &request.message).await {
        Ok(Some(reply)) => Ok((StatusCode::OK, Json(RelayResponse { reply }))),
        Ok(None) => {
            tracing::warn!("Upstream response carried no text; using fallback reply");
            Ok((
                StatusCode::OK,
                Json(RelayResponse {
                    reply: NO_RESPONSE_REPLY.to_string(),
                }),
            ))
        }
        Err(failure) => {
            tracing::error!(
                request_id = %request_id.0,
                error = %failure,
                "Upstream call failed; using fallback reply"
            );
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RelayResponse {
                    reply: failure.fallback_reply().to_string(),
                }),
            ))
        }
    }
}

/// Issue exactly one `generateContent` call for `message`.
///
/// Returns the extracted text, `None` when the upstream succeeded without
/// text, or the failure to log.
async fn call_upstream(
    state: &AppState,
    message: &str,
) -> std::result::Result<Option<String>, UpstreamFailure> {
    let key_source = state.credentials.source();
    let api_key = state.credentials.api_key();
    tracing::info!(
        source = %key_source,
        present = api_key.is_some(),
        "Resolved upstream credential"
    );
    if api_key.is_none() {
        tracing::warn!(
            source = %key_source,
            "No upstream credential available; the upstream will likely reject the call"
        );
    }

    let upstream_url = state.config.upstream.generate_url();
    let body = GenerateContentRequest::single_user_turn(message);

    let mut upstream_request = state
        .http_client
        .post(&upstream_url)
        .header(header::CONTENT_TYPE, "application/json")
        .json(&body);

    if let Some(key) = &api_key {
        upstream_request = upstream_request.query(&[("key", key.expose_secret())]);
    }

    // reqwest errors embed the request URL, which carries the key.
    let upstream_response = upstream_request
        .send()
        .await
        .map_err(|e| UpstreamFailure::Transport(e.without_url().to_string()))?;

    let status = upstream_response.status();
    if !status.is_success() {
        let body = upstream_response.text().await.unwrap_or_default();
        return Err(UpstreamFailure::Status { status, body });
    }

    let bytes = upstream_response
        .bytes()
        .await
        .map_err(|e| UpstreamFailure::Transport(e.without_url().to_string()))?;

    let response: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| UpstreamFailure::Decode(e.to_string()))?;

    tracing::debug!(upstream_status = %status, "Upstream call succeeded");

    Ok(extract_reply(&response).map(str::to_string))
}

/// Any method a route does not serve.
pub async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chat-relay"
    }))
}
