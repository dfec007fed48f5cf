//! Identifier resolution
//!
//! Each routed field has an ordered list of candidate sources. The first
//! candidate that is present and non-blank wins:
//!
//! | Field         | Candidates (highest first)                                         |
//! |---------------|--------------------------------------------------------------------|
//! | target id     | request `target_id`, metadata `target_id`, request `model`         |
//! | session key   | request `session_key`, metadata `session_key`, generated key       |
//!
//! Metadata also accepts the legacy keys `chatbot_uuid` (target id) and
//! `user_key` (session key); the current key wins when both are present.
//! | custom prompt | request `custom_prompt`, latest plain system message, config value |
//! | callback url  | request `callback_url`, config value                               |

use rand::Rng;

use crate::config::{DefaultsConfig, SessionConfig};
use crate::error::{AppError, AppResult};
use crate::handlers::openai::types::ChatCompletionRequest;

use super::fields;
use super::metadata::Metadata;

/// Metadata key that overrides the target id
pub const META_TARGET_ID: &str = "target_id";
/// Metadata key that overrides the session key
pub const META_SESSION_KEY: &str = "session_key";
/// Legacy metadata key for the target id
pub const META_TARGET_ID_LEGACY: &str = "chatbot_uuid";
/// Legacy metadata key for the session key
pub const META_SESSION_KEY_LEGACY: &str = "user_key";

/// Routing fields for one downstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    pub target_id: String,
    pub session_key: String,
    pub custom_prompt: Option<String>,
    pub callback_url: Option<String>,
}

impl ResolvedFields {
    /// Resolve every routed field of `request`
    ///
    /// # Errors
    /// Returns [`AppError::MissingField`] when no target id candidate is usable.
    pub fn resolve(
        request: &ChatCompletionRequest,
        metadata: &Metadata,
        session: &SessionConfig,
        defaults: &DefaultsConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            target_id: resolve_target_id(request, metadata)?,
            session_key: resolve_session_key(request, metadata, &session.key_prefix),
            custom_prompt: resolve_custom_prompt(request, defaults),
            callback_url: resolve_callback_url(request, defaults),
        })
    }
}

/// First candidate that is present and not blank
pub fn first_non_empty<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

pub fn resolve_target_id(request: &ChatCompletionRequest, metadata: &Metadata) -> AppResult<String> {
    first_non_empty([
        request.target_id(),
        metadata.get(META_TARGET_ID),
        metadata.get(META_TARGET_ID_LEGACY),
        Some(request.model()),
    ])
    .map(str::to_string)
    .ok_or_else(|| {
        AppError::MissingField(
            "target id is missing (set `target_id`, a `@meta:target_id=` entry or `model`)"
                .to_string(),
        )
    })
}

pub fn resolve_session_key(
    request: &ChatCompletionRequest,
    metadata: &Metadata,
    prefix: &str,
) -> String {
    first_non_empty([
        request.session_key(),
        metadata.get(META_SESSION_KEY),
        metadata.get(META_SESSION_KEY_LEGACY),
    ])
        .map(str::to_string)
        .unwrap_or_else(|| generate_session_key(prefix))
}

/// `<prefix>_<8 hex chars>`; uniqueness is probabilistic only
pub fn generate_session_key(prefix: &str) -> String {
    let suffix: u32 = rand::rng().random();
    format!("{}_{:08x}", prefix, suffix)
}

pub fn resolve_custom_prompt(
    request: &ChatCompletionRequest,
    defaults: &DefaultsConfig,
) -> Option<String> {
    first_non_empty([
        request.custom_prompt(),
        fields::extract_custom_prompt(request.messages()),
        defaults.custom_prompt.as_deref(),
    ])
    .map(str::to_string)
}

pub fn resolve_callback_url(
    request: &ChatCompletionRequest,
    defaults: &DefaultsConfig,
) -> Option<String> {
    first_non_empty([request.callback_url(), defaults.callback_url.as_deref()]).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::openai::types::ChatCompletionRequestBuilder;
    use crate::pipeline::fields::extract_metadata;

    fn request_with(
        configure: impl FnOnce(ChatCompletionRequestBuilder) -> ChatCompletionRequestBuilder,
    ) -> ChatCompletionRequest {
        configure(ChatCompletionRequest::builder().model("model-c").user_message("hi"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_first_non_empty_skips_blank_candidates() {
        assert_eq!(first_non_empty([None, Some("  "), Some("x")]), Some("x"));
        assert_eq!(first_non_empty([Some(""), None]), None);
    }

    #[test]
    fn test_target_id_request_field_wins() {
        let request = request_with(|b| b.target_id("a").system_message("@meta:target_id=b"));
        let meta = extract_metadata(request.messages());
        assert_eq!(resolve_target_id(&request, &meta).unwrap(), "a");
    }

    #[test]
    fn test_target_id_metadata_beats_model() {
        let request = request_with(|b| b.system_message("@meta:target_id=b"));
        let meta = extract_metadata(request.messages());
        assert_eq!(resolve_target_id(&request, &meta).unwrap(), "b");
    }

    #[test]
    fn test_target_id_falls_back_to_model() {
        let request = request_with(|b| b);
        assert_eq!(
            resolve_target_id(&request, &Metadata::new()).unwrap(),
            "model-c"
        );
    }

    #[test]
    fn test_target_id_blank_request_field_is_skipped() {
        let request = request_with(|b| b.target_id(""));
        assert_eq!(
            resolve_target_id(&request, &Metadata::new()).unwrap(),
            "model-c"
        );
    }

    #[test]
    fn test_target_id_unresolvable_is_missing_field() {
        let request = ChatCompletionRequest::builder()
            .model("")
            .user_message("hi")
            .build()
            .unwrap();
        let err = resolve_target_id(&request, &Metadata::new()).unwrap_err();
        assert!(matches!(err, AppError::MissingField(_)));
    }

    #[test]
    fn test_session_key_precedence() {
        let request = request_with(|b| b.session_key("explicit").system_message("@meta:session_key=meta"));
        let meta = extract_metadata(request.messages());
        assert_eq!(resolve_session_key(&request, &meta, "p"), "explicit");

        let request = request_with(|b| {
            b.system_message("@meta:session_key=abc")
                .system_message("@meta:session_key=def")
        });
        let meta = extract_metadata(request.messages());
        assert_eq!(resolve_session_key(&request, &meta, "p"), "def");
    }

    #[test]
    fn test_legacy_metadata_keys_are_honoured() {
        let request = request_with(|b| {
            b.system_message("@meta:chatbot_uuid=bot-legacy")
                .system_message("@meta:user_key=user-legacy")
        });
        let meta = extract_metadata(request.messages());
        assert_eq!(resolve_target_id(&request, &meta).unwrap(), "bot-legacy");
        assert_eq!(resolve_session_key(&request, &meta, "p"), "user-legacy");
    }

    #[test]
    fn test_current_metadata_keys_beat_legacy_keys() {
        let request = request_with(|b| {
            b.system_message("@meta:target_id=bot-new")
                .system_message("@meta:chatbot_uuid=bot-old")
                .system_message("@meta:session_key=user-new")
                .system_message("@meta:user_key=user-old")
        });
        let meta = extract_metadata(request.messages());
        assert_eq!(resolve_target_id(&request, &meta).unwrap(), "bot-new");
        assert_eq!(resolve_session_key(&request, &meta, "p"), "user-new");
    }

    #[test]
    fn test_session_key_generated_with_prefix() {
        let request = request_with(|b| b);
        let key = resolve_session_key(&request, &Metadata::new(), "acme");
        let suffix = key.strip_prefix("acme_").expect("prefix");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_custom_prompt_precedence() {
        let defaults = DefaultsConfig {
            custom_prompt: Some("configured".to_string()),
            callback_url: None,
        };

        let request = request_with(|b| b.custom_prompt("explicit").system_message("from system"));
        assert_eq!(
            resolve_custom_prompt(&request, &defaults).as_deref(),
            Some("explicit")
        );

        let request = request_with(|b| b.system_message("from system"));
        assert_eq!(
            resolve_custom_prompt(&request, &defaults).as_deref(),
            Some("from system")
        );

        let request = request_with(|b| b.system_message("@meta:target_id=x"));
        assert_eq!(
            resolve_custom_prompt(&request, &defaults).as_deref(),
            Some("configured")
        );

        assert_eq!(
            resolve_custom_prompt(&request, &DefaultsConfig::default()),
            None
        );
    }

    #[test]
    fn test_callback_url_precedence() {
        let defaults = DefaultsConfig {
            custom_prompt: None,
            callback_url: Some("https://configured.example.com".to_string()),
        };
        let request = request_with(|b| b.callback_url("https://explicit.example.com"));
        assert_eq!(
            resolve_callback_url(&request, &defaults).as_deref(),
            Some("https://explicit.example.com")
        );

        let request = request_with(|b| b);
        assert_eq!(
            resolve_callback_url(&request, &defaults).as_deref(),
            Some("https://configured.example.com")
        );
        assert_eq!(resolve_callback_url(&request, &DefaultsConfig::default()), None);
    }

    #[test]
    fn test_resolve_all_fields() {
        let request = request_with(|b| b.system_message("@meta:session_key=user-1"));
        let meta = extract_metadata(request.messages());
        let resolved = ResolvedFields::resolve(
            &request,
            &meta,
            &SessionConfig::default(),
            &DefaultsConfig::default(),
        )
        .unwrap();

        assert_eq!(resolved.target_id, "model-c");
        assert_eq!(resolved.session_key, "user-1");
        assert_eq!(resolved.custom_prompt, None);
        assert_eq!(resolved.callback_url, None);
    }
}
