//! chatbridge - OpenAI-compatible gateway for conversational agent services
//!
//! Accepts OpenAI chat completion requests, resolves the downstream target,
//! session and credential, forwards the latest user message with bounded
//! retry, and translates the agent's answer back into a chat completion.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod telemetry;
