//! Command-line interface for chatbridge

use clap::{Parser, Subcommand};

/// OpenAI-compatible gateway for conversational agent services
#[derive(Parser)]
#[command(name = "chatbridge")]
#[command(version)]
#[command(about = "OpenAI-compatible gateway for conversational agent services")]
#[command(
    long_about = "chatbridge accepts OpenAI chat completion requests, forwards the latest \
    user message to a downstream conversational agent service and returns the agent's \
    answer as an OpenAI chat completion."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

pub fn generate_config_template() -> &'static str {
    r#"# chatbridge configuration

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# 0.0.0.0 for all interfaces, 127.0.0.1 for localhost only
host = "0.0.0.0"
port = 8000

# ─────────────────────────────────────────────────────────────────────────────
# DOWNSTREAM AGENT SERVICE
# ─────────────────────────────────────────────────────────────────────────────

[downstream]
# Full endpoint URL the translated request is POSTed to (http or https)
url = "https://agents.example.com/api/v1/chat/"

# Per-attempt timeout in seconds (1-300)
timeout_seconds = 20

# ─────────────────────────────────────────────────────────────────────────────
# RETRY
# ─────────────────────────────────────────────────────────────────────────────
#
# Retried: HTTP 500, 502, 503, 504 and connection failures.
# Delay before attempt n+1 is backoff_base_ms * 2^(n-1), capped at
# max_backoff_ms.

[retry]
max_attempts = 3
backoff_base_ms = 700
max_backoff_ms = 30000

# ─────────────────────────────────────────────────────────────────────────────
# AUTH
# ─────────────────────────────────────────────────────────────────────────────
#
# Downstream credential lookup, first match wins:
#   1. [auth.credentials] entry for the target
#   2. the caller's bearer token (when forward_caller_token = true)
#   3. default_credential

[auth]
forward_caller_token = true
# default_credential = "downstream-api-token"

# Restrict which target ids callers may address (omit to allow any)
# allowed_targets = ["support-bot", "sales-bot"]

[auth.credentials]
# support-bot = "token-for-support-bot"

# ─────────────────────────────────────────────────────────────────────────────
# SESSION
# ─────────────────────────────────────────────────────────────────────────────

[session]
# Generated session keys look like <key_prefix>_<8 hex chars>
key_prefix = "default_user"

# ─────────────────────────────────────────────────────────────────────────────
# DEFAULTS
# ─────────────────────────────────────────────────────────────────────────────
#
# Applied when the request does not carry its own value.

[defaults]
# custom_prompt = "Answer briefly."
# callback_url = "https://hooks.example.com/agent-events"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"

# Log inbound and outbound payloads at debug level
log_payloads = false
"#
}
