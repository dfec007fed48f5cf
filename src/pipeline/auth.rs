//! Caller authentication and downstream credential resolution

use axum::http::HeaderValue;
use std::collections::{HashMap, HashSet};

use crate::config::{AuthConfig, Credential};
use crate::error::{AppError, AppResult};

/// Extract the token from an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively, exactly one space must
/// separate scheme and token, and the token must be non-empty with no
/// whitespace of its own.
///
/// # Errors
/// Returns [`AppError::Unauthorized`] when the header is absent or malformed.
pub fn extract_bearer_token(header: Option<&HeaderValue>) -> AppResult<&str> {
    let header = header.ok_or_else(|| {
        AppError::Unauthorized(
            "missing Authorization header; use `Authorization: Bearer <API_KEY>`".to_string(),
        )
    })?;

    let malformed = || {
        AppError::Unauthorized(
            "malformed Authorization header; use `Authorization: Bearer <API_KEY>`".to_string(),
        )
    };

    let value = header.to_str().map_err(|_| malformed())?;
    let (scheme, token) = value.split_once(' ').ok_or_else(malformed)?;

    if !scheme.eq_ignore_ascii_case("bearer")
        || token.is_empty()
        || token.chars().any(char::is_whitespace)
    {
        return Err(malformed());
    }

    Ok(token)
}

/// Read-only view of the `[auth]` configuration used on every request
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    overrides: HashMap<String, Credential>,
    default_credential: Option<Credential>,
    allowed_targets: Option<HashSet<String>>,
    forward_caller_token: bool,
}

impl CredentialResolver {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            overrides: config.credentials.clone(),
            default_credential: config.default_credential.clone(),
            allowed_targets: config.allowed_targets.clone(),
            forward_caller_token: config.forward_caller_token,
        }
    }

    /// Check `target_id` against the allow-list, when one is configured
    ///
    /// # Errors
    /// Returns [`AppError::Forbidden`] for targets outside the allow-list.
    pub fn authorize_target(&self, target_id: &str) -> AppResult<()> {
        match &self.allowed_targets {
            Some(allowed) if !allowed.contains(target_id) => Err(AppError::Forbidden(format!(
                "target '{}' is not allowed",
                target_id
            ))),
            _ => Ok(()),
        }
    }

    /// Credential to present downstream for `target_id`
    ///
    /// Candidates, first match wins: per-target override, the caller's own
    /// token (when forwarding is enabled), the configured default.
    ///
    /// # Errors
    /// Returns [`AppError::Internal`] when no candidate applies.
    pub fn resolve(&self, target_id: &str, caller_token: &str) -> AppResult<String> {
        let forwarded = self.forward_caller_token.then_some(caller_token);

        [
            self.overrides.get(target_id).map(Credential::expose),
            forwarded,
            self.default_credential.as_ref().map(Credential::expose),
        ]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::Internal(format!(
                "no downstream credential configured for target '{}'",
                target_id
            ))
        })
    }
}

/// Mask a secret for logging, keeping only its last four characters
pub fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "***".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("***{}", tail)
}
