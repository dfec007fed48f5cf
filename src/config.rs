//! Configuration management for chatbridge
//!
//! Parses TOML configuration files and provides typed access to settings.
//! The resulting [`Config`] is loaded once at startup and shared read-only
//! by every request.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Upper bound for `downstream.timeout_seconds`
pub const MAX_TIMEOUT_SECONDS: u64 = 300;
/// Upper bound for `retry.max_attempts`
pub const MAX_ATTEMPTS_LIMIT: usize = 10;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub downstream: DownstreamConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Listen address; `host` must be a literal IP, hostnames are not resolved
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        let ip: IpAddr = self.host.trim().parse().map_err(|_| {
            AppError::Config(format!(
                "server.host '{}' must be an IP address such as 127.0.0.1 or 0.0.0.0",
                self.host
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Downstream agent service
///
/// Fields are private; the values are checked by [`Config::validate`] and
/// cannot change afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct DownstreamConfig {
    url: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl DownstreamConfig {
    /// Full URL the translated request is POSTed to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Per-attempt request timeout in seconds
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

fn default_timeout_seconds() -> u64 {
    20
}

/// Retry policy for the downstream call
///
/// Deserialization goes through [`RetryConfig::new`], so an invalid policy
/// is rejected while the TOML is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRetryConfig")]
pub struct RetryConfig {
    max_attempts: usize,
    backoff_base_ms: u64,
    max_backoff_ms: u64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRetryConfig {
    #[serde(default = "default_max_attempts")]
    max_attempts: usize,
    #[serde(default = "default_backoff_base_ms")]
    backoff_base_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,
}

impl TryFrom<RawRetryConfig> for RetryConfig {
    type Error = AppError;

    fn try_from(raw: RawRetryConfig) -> Result<Self, Self::Error> {
        RetryConfig::new(raw.max_attempts, raw.backoff_base_ms, raw.max_backoff_ms)
    }
}

fn default_max_attempts() -> usize {
    3
}

fn default_backoff_base_ms() -> u64 {
    700
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl RetryConfig {
    /// Create a validated retry policy
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is outside `1..=10` or if
    /// `max_backoff_ms` is smaller than `backoff_base_ms`.
    pub fn new(max_attempts: usize, backoff_base_ms: u64, max_backoff_ms: u64) -> AppResult<Self> {
        if max_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(AppError::Config(format!(
                "retry.max_attempts cannot exceed {}, got {}",
                MAX_ATTEMPTS_LIMIT, max_attempts
            )));
        }
        if max_backoff_ms < backoff_base_ms {
            return Err(AppError::Config(format!(
                "retry.max_backoff_ms ({}) must be >= retry.backoff_base_ms ({})",
                max_backoff_ms, backoff_base_ms
            )));
        }
        Ok(Self {
            max_attempts,
            backoff_base_ms,
            max_backoff_ms,
        })
    }

    /// Total number of attempts, including the first one
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before the second attempt; doubles for every later attempt
    pub fn backoff_base_ms(&self) -> u64 {
        self.backoff_base_ms
    }

    /// Ceiling applied to every backoff delay
    pub fn max_backoff_ms(&self) -> u64 {
        self.max_backoff_ms
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Secret value sent to the downstream service
///
/// `Debug` never prints the value; call [`Credential::expose`] where the
/// raw secret is really needed.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Caller authorization and downstream credential lookup
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Send the caller's bearer token downstream when no per-target
    /// override exists
    #[serde(default = "default_forward_caller_token")]
    pub forward_caller_token: bool,
    /// Used when neither an override nor the caller token applies
    #[serde(default)]
    pub default_credential: Option<Credential>,
    /// Target ids callers may address; `None` disables allow-listing
    #[serde(default)]
    pub allowed_targets: Option<HashSet<String>>,
    /// Per-target downstream credential overrides
    #[serde(default)]
    pub credentials: HashMap<String, Credential>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            forward_caller_token: default_forward_caller_token(),
            default_credential: None,
            allowed_targets: None,
            credentials: HashMap::new(),
        }
    }
}

fn default_forward_caller_token() -> bool {
    true
}

/// Session key generation
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_key_prefix() -> String {
    "default_user".to_string()
}

/// Values applied when the inbound request does not provide its own
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log inbound and outbound payloads at debug level
    #[serde(default)]
    pub log_payloads: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_payloads: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; tests that build a config
    /// through `toml::from_str` directly should call it themselves.
    pub fn validate(&self) -> AppResult<()> {
        self.server.socket_addr()?;

        if !is_http_url(&self.downstream.url) {
            return Err(AppError::Config(format!(
                "downstream.url '{}' must start with 'http://' or 'https://'",
                self.downstream.url
            )));
        }

        if self.downstream.timeout_seconds == 0 {
            return Err(AppError::Config(
                "downstream.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.downstream.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "downstream.timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, self.downstream.timeout_seconds
            )));
        }

        if self.session.key_prefix.trim().is_empty() {
            return Err(AppError::Config(
                "session.key_prefix cannot be empty".to_string(),
            ));
        }

        if let Some(allowed) = &self.auth.allowed_targets {
            if allowed.is_empty() {
                return Err(AppError::Config(
                    "auth.allowed_targets is empty, which would reject every request. \
                    Remove the key to disable allow-listing."
                        .to_string(),
                ));
            }
            if allowed.iter().any(|t| t.trim().is_empty()) {
                return Err(AppError::Config(
                    "auth.allowed_targets cannot contain empty target ids".to_string(),
                ));
            }
        }

        for (target, credential) in &self.auth.credentials {
            if target.trim().is_empty() {
                return Err(AppError::Config(
                    "auth.credentials cannot contain an empty target id".to_string(),
                ));
            }
            if credential.is_blank() {
                return Err(AppError::Config(format!(
                    "auth.credentials.{} has an empty credential",
                    target
                )));
            }
        }

        if self
            .auth
            .default_credential
            .as_ref()
            .is_some_and(Credential::is_blank)
        {
            return Err(AppError::Config(
                "auth.default_credential cannot be empty".to_string(),
            ));
        }

        if !self.auth.forward_caller_token
            && self.auth.default_credential.is_none()
            && self.auth.credentials.is_empty()
        {
            return Err(AppError::Config(
                "auth.forward_caller_token is disabled but neither auth.default_credential \
                nor auth.credentials is set; no downstream credential could ever be resolved"
                    .to_string(),
            ));
        }

        if let Some(url) = &self.defaults.callback_url
            && !is_http_url(url)
        {
            return Err(AppError::Config(format!(
                "defaults.callback_url '{}' must start with 'http://' or 'https://'",
                url
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 8000

[downstream]
url = "https://agents.example.com/api/v1/message/"
timeout_seconds = 20

[retry]
max_attempts = 3
backoff_base_ms = 700

[auth]
forward_caller_token = true
default_credential = "fallback-token"
allowed_targets = ["bot-a", "bot-b"]

[auth.credentials]
bot-a = "token-for-a"

[session]
key_prefix = "acme"

[defaults]
custom_prompt = "Answer briefly."
callback_url = "https://hooks.example.com/answers"

[observability]
log_level = "debug"
log_payloads = true
"#;

    const MINIMAL_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8000

[downstream]
url = "http://localhost:9000/message"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(
            config.downstream.url(),
            "https://agents.example.com/api/v1/message/"
        );
        assert_eq!(config.downstream.timeout_seconds(), 20);
    }

    #[test]
    fn test_config_parses_auth_section() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert!(config.auth.forward_caller_token);
        assert_eq!(
            config.auth.default_credential,
            Some(Credential::new("fallback-token"))
        );
        let allowed = config.auth.allowed_targets.as_ref().unwrap();
        assert!(allowed.contains("bot-a"));
        assert!(allowed.contains("bot-b"));
        assert_eq!(
            config.auth.credentials.get("bot-a").map(Credential::expose),
            Some("token-for-a")
        );
    }

    #[test]
    fn test_config_parses_defaults_and_session() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.session.key_prefix, "acme");
        assert_eq!(
            config.defaults.custom_prompt.as_deref(),
            Some("Answer briefly.")
        );
        assert_eq!(
            config.defaults.callback_url.as_deref(),
            Some("https://hooks.example.com/answers")
        );
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.log_payloads);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_str(MINIMAL_CONFIG).expect("should parse minimal config");
        assert_eq!(config.downstream.timeout_seconds(), 20);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(config.retry.backoff_base_ms(), 700);
        assert!(config.auth.forward_caller_token);
        assert!(config.auth.allowed_targets.is_none());
        assert!(config.auth.credentials.is_empty());
        assert_eq!(config.session.key_prefix, "default_user");
        assert!(config.defaults.custom_prompt.is_none());
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.log_payloads);
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("token-for-a"));
        assert!(!debug.contains("fallback-token"));
        assert!(debug.contains("Credential(***)"));
    }

    #[test]
    fn test_retry_zero_attempts_rejected_at_parse_time() {
        let config_str = format!("{}\n[retry]\nmax_attempts = 0\n", MINIMAL_CONFIG);
        let err = Config::from_str(&config_str).unwrap_err().to_string();
        assert!(err.contains("max_attempts"), "got: {}", err);
    }

    #[test]
    fn test_retry_backoff_cap_below_base_rejected() {
        let err = RetryConfig::new(3, 500, 100).unwrap_err().to_string();
        assert!(err.contains("max_backoff_ms"));
    }

    #[test]
    fn test_retry_attempts_upper_bound() {
        assert!(RetryConfig::new(MAX_ATTEMPTS_LIMIT, 1, 1).is_ok());
        assert!(RetryConfig::new(MAX_ATTEMPTS_LIMIT + 1, 1, 1).is_err());
    }

    #[test]
    fn test_server_host_must_be_ip_address() {
        let config_str = MINIMAL_CONFIG.replace("host = \"127.0.0.1\"", "host = \"localhost\"");
        let err = Config::from_str(&config_str).unwrap_err().to_string();
        assert!(err.contains("server.host 'localhost'"), "got: {}", err);

        let config = Config::from_str(MINIMAL_CONFIG).unwrap();
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "127.0.0.1:8000".parse::<SocketAddr>().unwrap()
        );
        let v6 = MINIMAL_CONFIG.replace("host = \"127.0.0.1\"", "host = \"::1\"");
        assert!(Config::from_str(&v6).is_ok());
    }

    #[test]
    fn test_downstream_url_must_be_http() {
        let config_str = MINIMAL_CONFIG.replace("http://localhost:9000/message", "ftp://nope");
        let err = Config::from_str(&config_str).unwrap_err().to_string();
        assert!(err.contains("downstream.url"), "got: {}", err);
    }

    #[test]
    fn test_downstream_timeout_bounds() {
        let zero = MINIMAL_CONFIG.replace(
            "url = \"http://localhost:9000/message\"",
            "url = \"http://localhost:9000/message\"\ntimeout_seconds = 0",
        );
        assert!(Config::from_str(&zero).is_err());

        let huge = MINIMAL_CONFIG.replace(
            "url = \"http://localhost:9000/message\"",
            "url = \"http://localhost:9000/message\"\ntimeout_seconds = 301",
        );
        assert!(Config::from_str(&huge).is_err());
    }

    #[test]
    fn test_empty_allow_list_rejected() {
        let config_str = format!("{}\n[auth]\nallowed_targets = []\n", MINIMAL_CONFIG);
        let err = Config::from_str(&config_str).unwrap_err().to_string();
        assert!(err.contains("allowed_targets"));
    }

    #[test]
    fn test_unresolvable_credential_setup_rejected() {
        let config_str = format!("{}\n[auth]\nforward_caller_token = false\n", MINIMAL_CONFIG);
        let err = Config::from_str(&config_str).unwrap_err().to_string();
        assert!(err.contains("forward_caller_token"));
    }

    #[test]
    fn test_blank_override_credential_rejected() {
        let config_str = format!("{}\n[auth.credentials]\nbot-a = \"  \"\n", MINIMAL_CONFIG);
        let err = Config::from_str(&config_str).unwrap_err().to_string();
        assert!(err.contains("bot-a"));
    }

    #[test]
    fn test_empty_session_prefix_rejected() {
        let config_str = format!("{}\n[session]\nkey_prefix = \"\"\n", MINIMAL_CONFIG);
        assert!(Config::from_str(&config_str).is_err());
    }

    #[test]
    fn test_default_callback_url_must_be_http() {
        let config_str = format!("{}\n[defaults]\ncallback_url = \"hooks\"\n", MINIMAL_CONFIG);
        let err = Config::from_str(&config_str).unwrap_err().to_string();
        assert!(err.contains("callback_url"));
    }

    #[test]
    fn test_missing_downstream_section_fails() {
        let config_str = "[server]\nhost = \"127.0.0.1\"\nport = 8000\n";
        let err = Config::from_str(config_str).unwrap_err().to_string();
        assert!(err.contains("downstream"), "got: {}", err);
    }
}
