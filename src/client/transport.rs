//! Network seam between the widget and the relay.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::relay::RelayRequest;

/// Relay body as the widget reads it. `reply` may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RelayReply {
    #[serde(default)]
    pub reply: Option<String>,
}

/// Errors from a single relay call, rendered into the transcript.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    /// The relay answered with a non-2xx status.
    #[error("Failed to fetch AI response")]
    Status(StatusCode),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// Sends one relay request and yields the parsed reply.
pub trait RelayTransport: Send + Sync + 'static {
    fn send(
        &self,
        request: RelayRequest,
    ) -> impl Future<Output = Result<RelayReply, WidgetError>> + Send;
}

/// reqwest-backed transport posting JSON to the relay URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// Build a transport for `url`. Without `timeout` the request is bounded
    /// only by the underlying connection.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, WidgetError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RelayTransport for HttpTransport {
    async fn send(&self, request: RelayRequest) -> Result<RelayReply, WidgetError> {
        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, body = %body, "Relay returned error status");
            return Err(WidgetError::Status(status));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| WidgetError::Decode(e.to_string()))
    }
}
