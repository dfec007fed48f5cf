//! OpenAI-compatible request and response types
//!
//! These types follow the OpenAI Chat Completions envelope, extended with the
//! optional routing overrides the gateway understands. Validation is enforced
//! during deserialization - invalid instances cannot exist.

use serde::{Deserialize, Deserializer, Serialize};

/// Object type for non-streaming chat completion responses
pub const OBJECT_CHAT_COMPLETION: &str = "chat.completion";

/// Number of hex characters in a generated completion id suffix
const COMPLETION_ID_HEX_LEN: usize = 10;

/// Validate the sampling fields carried for OpenAI compatibility
///
/// Shared by the builder and the serde deserializer.
fn validate_request_fields(temperature: Option<f64>, max_tokens: Option<u32>) -> Result<(), String> {
    if let Some(temp) = temperature {
        if !temp.is_finite() {
            return Err("temperature must be a finite number".to_string());
        }
        if !(0.0..=2.0).contains(&temp) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }
    }

    if let Some(max) = max_tokens
        && max == 0
    {
        return Err("max_tokens must be greater than 0".to_string());
    }

    Ok(())
}

// =============================================================================
// Message Types
// =============================================================================

/// Message role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    role: MessageRole,
    content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

// =============================================================================
// Chat Completion Request
// =============================================================================

/// Inbound chat completion request
///
/// Besides the standard `model`/`messages` pair it carries optional
/// overrides for the downstream call. The names used by older clients
/// (`chatbot_uuid`, `user_key`, `custom_base_system_prompt`,
/// `recipent_url`) are accepted as well; when a body carries both names
/// for the same field, the current name wins unless it is blank.
///
/// `temperature` and `max_tokens` are validated for compatibility but are
/// not forwarded downstream.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Current field name wins over its legacy name unless it is blank
fn prefer_current(current: Option<String>, legacy: Option<String>) -> Option<String> {
    match current {
        Some(value) if !value.trim().is_empty() => Some(value),
        current => legacy.or(current),
    }
}

impl<'de> Deserialize<'de> for ChatCompletionRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawRequest {
            model: String,
            messages: Vec<ChatMessage>,
            #[serde(default)]
            target_id: Option<String>,
            #[serde(default)]
            chatbot_uuid: Option<String>,
            #[serde(default)]
            session_key: Option<String>,
            #[serde(default)]
            user_key: Option<String>,
            #[serde(default)]
            custom_prompt: Option<String>,
            #[serde(default)]
            custom_base_system_prompt: Option<String>,
            #[serde(default)]
            callback_url: Option<String>,
            #[serde(default)]
            recipent_url: Option<String>,
            #[serde(default)]
            temperature: Option<f64>,
            #[serde(default)]
            max_tokens: Option<u32>,
        }

        let raw = RawRequest::deserialize(deserializer)?;
        validate_request_fields(raw.temperature, raw.max_tokens)
            .map_err(serde::de::Error::custom)?;

        Ok(ChatCompletionRequest {
            model: raw.model,
            messages: raw.messages,
            target_id: prefer_current(raw.target_id, raw.chatbot_uuid),
            session_key: prefer_current(raw.session_key, raw.user_key),
            custom_prompt: prefer_current(raw.custom_prompt, raw.custom_base_system_prompt),
            callback_url: prefer_current(raw.callback_url, raw.recipent_url),
            temperature: raw.temperature,
            max_tokens: raw.max_tokens,
        })
    }
}

impl ChatCompletionRequest {
    /// Start building a request programmatically
    pub fn builder() -> ChatCompletionRequestBuilder {
        ChatCompletionRequestBuilder::default()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref()
    }

    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    pub fn custom_prompt(&self) -> Option<&str> {
        self.custom_prompt.as_deref()
    }

    pub fn callback_url(&self) -> Option<&str> {
        self.callback_url.as_deref()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }
}

/// Builder for constructing [`ChatCompletionRequest`] programmatically
///
/// Performs the same validation as JSON deserialization.
///
/// # Examples
///
/// ```
/// use chatbridge::handlers::openai::types::ChatCompletionRequest;
///
/// let request = ChatCompletionRequest::builder()
///     .model("support-bot")
///     .system_message("@meta:session_key=user-42")
///     .user_message("Where is my order?")
///     .build()
///     .expect("valid request");
/// assert_eq!(request.messages().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ChatCompletionRequestBuilder {
    model: String,
    messages: Vec<ChatMessage>,
    target_id: Option<String>,
    session_key: Option<String>,
    custom_prompt: Option<String>,
    callback_url: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl ChatCompletionRequestBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn system_message(self, content: impl Into<String>) -> Self {
        self.message(ChatMessage::system(content))
    }

    pub fn user_message(self, content: impl Into<String>) -> Self {
        self.message(ChatMessage::user(content))
    }

    pub fn assistant_message(self, content: impl Into<String>) -> Self {
        self.message(ChatMessage::assistant(content))
    }

    pub fn target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn session_key(mut self, session_key: impl Into<String>) -> Self {
        self.session_key = Some(session_key.into());
        self
    }

    pub fn custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns the same validation message deserialization would produce.
    pub fn build(self) -> Result<ChatCompletionRequest, String> {
        validate_request_fields(self.temperature, self.max_tokens)?;
        Ok(ChatCompletionRequest {
            model: self.model,
            messages: self.messages,
            target_id: self.target_id,
            session_key: self.session_key,
            custom_prompt: self.custom_prompt,
            callback_url: self.callback_url,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }
}

// =============================================================================
// Chat Completion Response
// =============================================================================

/// Completion reason reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
}

/// Assistant message inside a completion choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessage {
    role: MessageRole,
    content: String,
}

impl AssistantMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: FinishReason,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
}

impl ChatCompletion {
    /// Wrap an answer into a single-choice completion
    ///
    /// # Arguments
    /// * `content` - The assistant's answer
    /// * `model` - Reported model name (the resolved target id)
    /// * `created` - Unix timestamp (use the `current_timestamp()` helper)
    pub fn new(content: impl Into<String>, model: impl Into<String>, created: i64) -> Self {
        Self {
            id: generate_completion_id(),
            object: OBJECT_CHAT_COMPLETION.to_string(),
            created,
            model: model.into(),
            choices: vec![Choice {
                index: 0,
                message: AssistantMessage::new(content),
                finish_reason: FinishReason::Stop,
            }],
        }
    }
}

/// Fresh completion id of the form `chatcmpl-<10 hex chars>`
pub fn generate_completion_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &hex[..COMPLETION_ID_HEX_LEN])
}

/// Get the current Unix timestamp for response creation.
///
/// If the system clock is before the UNIX epoch, returns 0, logs a warning
/// and bumps the clock error metric when one is supplied.
pub fn current_timestamp(
    metrics: Option<&crate::metrics::Metrics>,
    request_id: Option<&crate::middleware::RequestId>,
) -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_else(|e| {
            match request_id {
                Some(rid) => tracing::warn!(
                    request_id = %rid,
                    error = %e,
                    "System clock appears to be before UNIX epoch - using 0 as timestamp"
                ),
                None => tracing::warn!(
                    error = %e,
                    "System clock appears to be before UNIX epoch - using 0 as timestamp"
                ),
            }
            if let Some(m) = metrics {
                m.clock_error();
            }
            0
        })
}
