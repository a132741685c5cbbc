//! Configuration parsing and validation for chat-relay.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Path the relay endpoint is mounted on
    #[serde(default = "default_relay_path")]
    pub relay_path: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_relay_path() -> String {
    "/api/chat".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            relay_path: default_relay_path(),
        }
    }
}

/// Generative-language API configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// API root, without trailing `/models/...`
    pub base_url: String,
    /// Model name used in the `generateContent` path
    pub model: String,
    /// Key fixed at load time, if the config file provides one
    pub api_key: Option<ApiKey>,
    /// Environment variable read on every call when `api_key` is unset
    pub api_key_env: String,
    /// Total request timeout for upstream calls, in seconds
    pub timeout_secs: u64,
    /// How `api_key` was resolved
    pub key_source: KeySource,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_upstream_timeout() -> u64 {
    120
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_upstream_timeout(),
            key_source: KeySource::Env(default_api_key_env()),
        }
    }
}

impl UpstreamConfig {
    /// Full `generateContent` URL for the configured model, without the key.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Build the credential source the relay resolves keys from.
    pub fn credential_source(&self) -> Box<dyn CredentialSource> {
        match &self.api_key {
            Some(key) => Box::new(StaticCredential::new(
                Some(key.clone()),
                self.key_source.clone(),
            )),
            None => Box::new(EnvCredential::new(self.api_key_env.clone())),
        }
    }
}

/// Terminal chat client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Relay endpoint URL the widget posts to
    #[serde(default = "default_client_url")]
    pub url: String,
    /// Optional request timeout; unset means the transport decides
    pub timeout_secs: Option<u64>,
}

fn default_client_url() -> String {
    "http://127.0.0.1:8080/api/chat".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_client_url(),
            timeout_secs: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// Only accessible via `.expose_secret()`, so every use is grep-auditable.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// Where the upstream credential comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Key was a literal string in config
    Literal,
    /// Key contained ${VAR} references expanded at load time
    EnvExpanded,
    /// Key is read from this environment variable on every call
    Env(String),
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Env(var) => write!(f, "env ({})", var),
        }
    }
}

/// Supplies the upstream credential to the relay, once per call.
pub trait CredentialSource: Send + Sync {
    /// Resolve the current key, if any.
    fn api_key(&self) -> Option<ApiKey>;

    /// Describe the source for diagnostics. Never includes the value.
    fn source(&self) -> KeySource;
}

/// A key fixed at startup (literal or expanded from config).
#[derive(Debug, Clone)]
pub struct StaticCredential {
    key: Option<ApiKey>,
    source: KeySource,
}

impl StaticCredential {
    pub fn new(key: Option<ApiKey>, source: KeySource) -> Self {
        Self { key, source }
    }
}

impl CredentialSource for StaticCredential {
    fn api_key(&self) -> Option<ApiKey> {
        self.key.clone()
    }

    fn source(&self) -> KeySource {
        self.source.clone()
    }
}

/// A key read from the process environment on every call.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredential {
    fn api_key(&self) -> Option<ApiKey> {
        std::env::var(&self.var)
            .ok()
            .filter(|v| !v.is_empty())
            .map(ApiKey::from)
    }

    fn source(&self) -> KeySource {
        KeySource::Env(self.var.clone())
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// `${VAR}` references in `upstream.api_key` are expanded from the
    /// environment before validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        let config = Self::from_raw(raw, |name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Convert raw (deserialized) config to final config.
    ///
    /// - `api_key` containing `${VAR}`: expanded with `lookup`, source = `EnvExpanded`
    /// - `api_key` literal: wrapped directly, source = `Literal`
    /// - `api_key` absent: source = `Env(api_key_env)`, read per call
    fn from_raw<F>(raw: RawConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ru = raw.upstream;
        let (api_key, key_source) = match ru.api_key {
            Some(ref raw_key) if raw_key.contains("${") => {
                let expanded = expand_env_vars_with(raw_key, lookup)?;
                (Some(ApiKey::from(expanded)), KeySource::EnvExpanded)
            }
            Some(ref raw_key) => (Some(ApiKey::from(raw_key.as_str())), KeySource::Literal),
            None => (None, KeySource::Env(ru.api_key_env.clone())),
        };

        Ok(Config {
            server: raw.server,
            upstream: UpstreamConfig {
                base_url: ru.base_url,
                model: ru.model,
                api_key,
                api_key_env: ru.api_key_env,
                timeout_secs: ru.timeout_secs,
                key_source,
            },
            client: raw.client,
            logging: raw.logging,
        })
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.relay_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "relay_path '{}' must start with '/'",
                self.server.relay_path
            )));
        }

        if self.upstream.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "upstream base_url is empty".to_string(),
            ));
        }

        if self.upstream.model.is_empty() {
            return Err(ConfigError::Validation(
                "upstream model is empty".to_string(),
            ));
        }

        if self.upstream.api_key.is_none() && self.upstream.api_key_env.is_empty() {
            return Err(ConfigError::Validation(
                "either upstream api_key or api_key_env must be set".to_string(),
            ));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "upstream timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for upstream api_key: {message}")]
    EnvVar { var: String, message: String },
}

/// Raw upstream config deserialized directly from TOML.
/// api_key is `Option<String>` so it may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
struct RawUpstreamConfig {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_model")]
    model: String,
    api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    api_key_env: String,
    #[serde(default = "default_upstream_timeout")]
    timeout_secs: u64,
}

impl Default for RawUpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

/// Raw configuration deserialized directly from TOML.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    upstream: RawUpstreamConfig,
    #[serde(default)]
    client: ClientConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports multiple `${VAR}` in one string. Fails on the first missing
/// variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        // The value is a secret; error messages never echo it.
        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            message: "Unclosed '${' in api_key".to_string(),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            message: format!("Environment variable '{}' is not set", var_name),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}
