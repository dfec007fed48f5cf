//! Configuration file loading and validation errors

use chatbridge::config::Config;
use chatbridge::error::AppError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("should create temp file");
    file.write_all(content.as_bytes())
        .expect("should write temp file");
    file
}

const VALID: &str = r#"
[server]
host = "0.0.0.0"
port = 8000

[downstream]
url = "https://agents.example.com/api/v1/message/"

[auth]
forward_caller_token = false
default_credential = "managed-secret"
allowed_targets = ["bot-a", "bot-b"]

[auth.credentials]
bot-a = "bot-a-secret"

[defaults]
custom_prompt = "Be concise."
"#;

#[test]
fn test_loads_valid_file_with_defaults() {
    let file = write_config(VALID);
    let config = Config::from_file(file.path()).expect("config should load");

    assert_eq!(config.server.port, 8000);
    assert_eq!(config.downstream.timeout_seconds(), 20);
    assert_eq!(config.retry.max_attempts(), 3);
    assert_eq!(config.retry.backoff_base_ms(), 700);
    assert_eq!(config.session.key_prefix, "default_user");
    assert!(!config.auth.forward_caller_token);
    assert_eq!(config.auth.credentials["bot-a"].expose(), "bot-a-secret");
    assert_eq!(config.defaults.custom_prompt.as_deref(), Some("Be concise."));
    assert_eq!(config.observability.log_level, "info");
}

#[test]
fn test_credentials_are_not_debug_printed() {
    let file = write_config(VALID);
    let config = Config::from_file(file.path()).unwrap();
    let debug = format!("{:?}", config);
    assert!(!debug.contains("managed-secret"));
    assert!(!debug.contains("bot-a-secret"));
}

#[test]
fn test_missing_file_names_path() {
    let err = Config::from_file("/nonexistent/chatbridge.toml").unwrap_err();
    assert!(matches!(err, AppError::ConfigFileRead { .. }));
    assert!(err.to_string().contains("/nonexistent/chatbridge.toml"));
}

#[test]
fn test_invalid_toml_names_path() {
    let file = write_config("[server\nhost = ");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, AppError::ConfigParseFailed { .. }));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn test_invalid_values_name_path_and_reason() {
    let file = write_config(
        r#"
[server]
host = "0.0.0.0"
port = 8000

[downstream]
url = "ftp://agents.example.com"
"#,
    );
    let err = Config::from_file(file.path()).unwrap_err();
    match &err {
        AppError::ConfigValidationFailed { path, reason } => {
            assert_eq!(path, &file.path().display().to_string());
            assert!(reason.contains("downstream.url"));
        }
        other => panic!("expected ConfigValidationFailed, got {:?}", other),
    }
}

#[test]
fn test_hostname_listen_address_is_rejected() {
    let file = write_config(
        r#"
[server]
host = "localhost"
port = 8000

[downstream]
url = "https://agents.example.com"
"#,
    );
    let err = Config::from_file(file.path()).unwrap_err();
    match &err {
        AppError::ConfigValidationFailed { reason, .. } => {
            assert!(reason.contains("server.host"), "got: {}", reason);
        }
        other => panic!("expected ConfigValidationFailed, got {:?}", other),
    }
}

#[test]
fn test_invalid_retry_policy_is_rejected_while_parsing() {
    let file = write_config(
        r#"
[server]
host = "0.0.0.0"
port = 8000

[downstream]
url = "https://agents.example.com"

[retry]
max_attempts = 0
"#,
    );
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, AppError::ConfigParseFailed { .. }));
    assert!(err.to_string().contains("max_attempts"));
}

#[test]
fn test_template_round_trips_through_file() {
    let file = write_config(chatbridge::cli::generate_config_template());
    assert!(Config::from_file(file.path()).is_ok());
}
