//! Parser for metadata carried in system messages
//!
//! Grammar of a metadata entry:
//!
//! ```text
//! entry := "@meta:" key "=" value
//! key   := any text up to the first "=" (surrounding whitespace trimmed, non-empty)
//! value := the remaining text, "=" included (surrounding whitespace trimmed)
//! ```
//!
//! Entries that carry the prefix but do not match the grammar are malformed.
//! Callers skip them; they never abort a request.

use std::collections::HashMap;
use thiserror::Error;

/// Sentinel that marks a system message as a metadata entry
pub const META_PREFIX: &str = "@meta:";

/// Why a prefixed entry could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataEntryError {
    #[error("metadata entry has no '=' separator")]
    MissingSeparator,
    #[error("metadata entry has an empty key")]
    EmptyKey,
}

/// Whether `content` carries the metadata sentinel
pub fn is_metadata_entry(content: &str) -> bool {
    content.starts_with(META_PREFIX)
}

/// Parse one metadata entry into a trimmed `(key, value)` pair
///
/// Returns `None` when `content` does not start with [`META_PREFIX`].
pub fn parse_entry(content: &str) -> Option<Result<(&str, &str), MetadataEntryError>> {
    let body = content.strip_prefix(META_PREFIX)?;
    let parsed = match body.split_once('=') {
        None => Err(MetadataEntryError::MissingSeparator),
        Some((key, _)) if key.trim().is_empty() => Err(MetadataEntryError::EmptyKey),
        Some((key, value)) => Ok((key.trim(), value.trim())),
    };
    Some(parsed)
}

/// Key/value settings collected from a conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: HashMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; a later insert for the same key wins
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
