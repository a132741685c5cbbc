//! Integration tests for loading configuration from a TOML file.
//!
//! Each test uses unique file paths and env var names to avoid parallel test interference.

use chat_relay::config::{Config, ConfigError, KeySource};
use std::fs;

/// `${VAR}` in `upstream.api_key` is expanded from the environment at load time.
#[test]
fn test_file_with_expanded_key() {
    let var_name = "CHAT_RELAY_FILE_TEST_KEY";
    let config_path = std::env::temp_dir().join("chat_relay_file_expanded.toml");

    unsafe { std::env::set_var(var_name, "AIza-file-secret") };

    let toml_content = format!(
        r#"
[server]
listen = "127.0.0.1:19876"

[upstream]
model = "gemini-1.5-flash"
api_key = "${{{}}}"
"#,
        var_name
    );
    fs::write(&config_path, toml_content).expect("Failed to write temp config");

    let config = Config::from_file(&config_path).expect("config should load");
    assert_eq!(config.server.listen, "127.0.0.1:19876");
    assert_eq!(config.upstream.key_source, KeySource::EnvExpanded);
    assert_eq!(
        config.upstream.api_key.as_ref().unwrap().expose_secret(),
        "AIza-file-secret"
    );

    let credentials = config.upstream.credential_source();
    assert_eq!(
        credentials.api_key().unwrap().expose_secret(),
        "AIza-file-secret"
    );

    unsafe { std::env::remove_var(var_name) };
    let _ = fs::remove_file(&config_path);
}

/// Without `api_key`, the key is read from `api_key_env` on every call.
#[test]
fn test_file_without_key_reads_env_per_call() {
    let var_name = "CHAT_RELAY_FILE_TEST_PER_CALL";
    let config_path = std::env::temp_dir().join("chat_relay_file_per_call.toml");

    let toml_content = format!(
        r#"
[upstream]
api_key_env = "{}"
"#,
        var_name
    );
    fs::write(&config_path, toml_content).expect("Failed to write temp config");

    unsafe { std::env::remove_var(var_name) };
    let config = Config::from_file(&config_path).expect("config should load");
    let credentials = config.upstream.credential_source();

    assert_eq!(credentials.source(), KeySource::Env(var_name.to_string()));
    assert!(credentials.api_key().is_none());

    unsafe { std::env::set_var(var_name, "rotated-key") };
    assert_eq!(credentials.api_key().unwrap().expose_secret(), "rotated-key");

    unsafe { std::env::remove_var(var_name) };
    let _ = fs::remove_file(&config_path);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = Config::from_file("/nonexistent/chat_relay/config.toml");
    assert!(matches!(result, Err(ConfigError::Io { .. })));
    let err = result.unwrap_err().to_string();
    assert!(err.contains("/nonexistent/chat_relay/config.toml"), "{}", err);
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let result = Config::parse_str("[server\nlisten = ");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_env_var_error_does_not_leak_other_text() {
    let var_name = "CHAT_RELAY_FILE_TEST_DEFINITELY_MISSING";
    unsafe { std::env::remove_var(var_name) };

    let toml_content = format!(
        r#"
[upstream]
api_key = "prefix-secret-${{{}}}"
"#,
        var_name
    );
    let err = Config::parse_str(&toml_content).unwrap_err().to_string();
    assert!(err.contains(var_name), "{}", err);
    assert!(!err.contains("prefix-secret"), "{}", err);
}
