//! chat-relay - a chat widget and the relay that fronts a generative-language API
//!
//! This library provides the relay server, its configuration, and the
//! client-side widget that talks to it.

pub mod client;
pub mod config;
pub mod error;
pub mod relay;

pub use config::Config;
pub use error::{Error, Result};
