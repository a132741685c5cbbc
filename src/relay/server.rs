//! HTTP server setup and configuration.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use super::handlers;
use crate::config::{Config, CredentialSource};

/// Response header: correlation ID (UUID v4).
pub const REQUEST_ID_HEADER: &str = "x-relay-request-id";

/// Correlation ID assigned to every incoming request.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Shared application state.
///
/// Everything here is read-only; requests never coordinate with each other.
#[derive(Clone)]
pub struct AppState {
    pub http_client: Client,
    pub config: Arc<Config>,
    pub credentials: Arc<dyn CredentialSource>,
}

impl AppState {
    /// Build state from config, with an upstream client bounded by
    /// `upstream.timeout_secs`.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let credentials: Arc<dyn CredentialSource> =
            Arc::from(config.upstream.credential_source());

        Ok(Self {
            http_client,
            config: Arc::new(config),
            credentials,
        })
    }
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let relay_path = state.config.server.relay_path.clone();

    Router::new()
        .route(
            &relay_path,
            post(handlers::relay_chat).fallback(handlers::method_not_allowed),
        )
        .route(
            "/health",
            get(handlers::health).fallback(handlers::method_not_allowed),
        )
        .with_state(state)
        .layer(middleware::from_fn(assign_request_id))
        .layer(TraceLayer::new_for_http())
}

/// Tag the request with a fresh correlation ID, run it inside a span carrying
/// that ID, and echo the ID back in the response headers.
async fn assign_request_id(mut req: Request, next: Next) -> Response {
    let request_id = RequestId(Uuid::new_v4());
    req.extensions_mut().insert(request_id);

    let span = tracing::info_span!("relay_request", request_id = %request_id.0);
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.0.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();
    let relay_path = config.server.relay_path.clone();

    let state = AppState::from_config(config)?;
    tracing::info!(
        key_source = %state.credentials.source(),
        upstream = %state.config.upstream.generate_url(),
        "Configured upstream credential source"
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, path = %relay_path, "Starting chat relay server");

    axum::serve(listener, app).await?;

    Ok(())
}
