//! OpenAI-compatible API handlers
//!
//! - `POST /v1/chat/completions` - translate and forward to the agent service

pub mod completions;
pub mod extractor;
pub mod types;
