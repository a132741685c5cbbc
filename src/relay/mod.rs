//! HTTP relay module.
//!
//! Accepts chat messages from the widget, forwards each one as a single
//! user turn to the generative-language API, and reshapes the answer into
//! a `{ "reply": ... }` body.

mod handlers;
mod server;
pub mod types;

pub use handlers::{NO_RESPONSE_REPLY, UPSTREAM_ERROR_REPLY, UPSTREAM_UNREACHABLE_REPLY};
pub use server::{create_router, run_server, AppState, RequestId, REQUEST_ID_HEADER};
pub use types::{GenerateContentRequest, RelayRequest, RelayResponse};
