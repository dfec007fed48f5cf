//! Field extraction from the inbound conversation
//!
//! Pulls the user query, the metadata entries and the custom instruction out
//! of the message list. Order matters: the query and the custom instruction
//! come from the most recent matching message, metadata is applied oldest
//! first so later entries override earlier ones.

use crate::error::{AppError, AppResult};
use crate::handlers::openai::types::{ChatMessage, MessageRole};

use super::metadata::{self, Metadata};

/// Content of the most recent `user` message
///
/// # Errors
/// Returns [`AppError::Validation`] if the conversation has no user message.
pub fn extract_user_message(messages: &[ChatMessage]) -> AppResult<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role() == MessageRole::User)
        .map(ChatMessage::content)
        .ok_or_else(|| {
            AppError::Validation("no user message found in the conversation".to_string())
        })
}

/// Collect `@meta:key=value` entries from system messages
///
/// Malformed entries are logged and skipped.
pub fn extract_metadata(messages: &[ChatMessage]) -> Metadata {
    let mut meta = Metadata::new();
    for (position, message) in messages.iter().enumerate() {
        if message.role() != MessageRole::System {
            continue;
        }
        match metadata::parse_entry(message.content()) {
            Some(Ok((key, value))) => meta.insert(key, value),
            Some(Err(e)) => {
                tracing::debug!(
                    message_index = position,
                    error = %e,
                    "Skipping malformed metadata entry"
                );
            }
            None => {}
        }
    }
    meta
}

/// Content of the most recent system message that is not a metadata entry
pub fn extract_custom_prompt(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role() == MessageRole::System && !metadata::is_metadata_entry(m.content()))
        .map(ChatMessage::content)
}
