//! Request input types: chat messages and completion parameters.

use serde::{Deserialize, Serialize};

use llm_router_core::RouterError;

use crate::config::{FallbackConfig, RetryConfig};

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One block of a multi-part message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: String },
}

/// Message content: either plain text or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A tool invocation requested by an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub arguments: String,
}

/// One message in a chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, text)
    }

    fn plain(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(text.into())),
            name: None,
            tool_calls: None,
        }
    }
}

/// Parameters for one routed completion call.
///
/// `retry` and `fallback` override the router's defaults for this call only;
/// unset fields are filled from the router configuration during input
/// normalization, on a copy, without touching the caller's value.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub model_group: String,
    pub text: Option<String>,
    pub messages: Option<Vec<ChatMessage>>,
    pub retry: Option<RetryConfig>,
    pub fallback: Option<FallbackConfig>,
}

impl CompletionParams {
    /// Parameters for a plain-text completion.
    pub fn from_text(model_group: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model_group: model_group.into(),
            text: Some(text.into()),
            messages: None,
            retry: None,
            fallback: None,
        }
    }

    /// Parameters for a chat completion.
    pub fn from_messages(model_group: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model_group: model_group.into(),
            text: None,
            messages: Some(messages),
            retry: None,
            fallback: None,
        }
    }

    /// Per-call retry override.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Per-call fallback override.
    pub fn with_fallback(mut self, fallback: FallbackConfig) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Rejects input that carries neither text nor messages.
    pub fn validate(&self) -> Result<(), RouterError> {
        let has_text = self.text.as_deref().is_some_and(|t| !t.is_empty());
        let has_messages = self.messages.as_deref().is_some_and(|m| !m.is_empty());
        if !has_text && !has_messages {
            return Err(RouterError::InvalidInput {
                message: "either 'text' or 'messages' must be provided".to_string(),
            });
        }
        Ok(())
    }
}
