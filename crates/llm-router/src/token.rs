//! Token counting.
//!
//! The router counts input tokens once per call, before scheduling, and the
//! result drives TPM reservations and lowest-TPM scheduling. The counter is
//! synchronous and pluggable; the default implementation uses the
//! `cl100k_base` encoding via tiktoken.

use tiktoken_rs::CoreBPE;

use crate::config::ConfigError;
use crate::model::{ChatMessage, ContentPart, MessageContent};

/// Overhead charged per chat message.
const TOKENS_PER_MESSAGE: u64 = 3;
/// Extra charge when a message carries a participant name.
const TOKENS_PER_NAME: u64 = 1;
/// Priming for the assistant reply.
const REPLY_PRIMING: u64 = 3;
/// Flat charge per image part.
const IMAGE_TOKENS: u64 = 250;

/// Synchronous token counter over the router's input shapes.
pub trait TokenCounter: Send + Sync {
    /// Counts input tokens. `messages` wins over `text` when both are
    /// given; absent input counts as zero.
    fn count(
        &self,
        model: Option<&str>,
        messages: Option<&[ChatMessage]>,
        text: Option<&str>,
    ) -> u64;
}

/// Token counter backed by tiktoken's `cl100k_base` encoding.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    pub fn new() -> Result<Self, ConfigError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ConfigError::TokenizerInit { message: e.to_string() })?;
        Ok(Self { bpe })
    }

    fn text_tokens(&self, text: &str) -> u64 {
        self.bpe.encode_ordinary(text).len() as u64
    }

    fn message_tokens(&self, message: &ChatMessage) -> u64 {
        let mut tokens = TOKENS_PER_MESSAGE;
        match &message.content {
            Some(MessageContent::Text(text)) => tokens += self.text_tokens(text),
            Some(MessageContent::Parts(parts)) => {
                for part in parts {
                    tokens += match part {
                        ContentPart::Text { text } => self.text_tokens(text),
                        ContentPart::ImageUrl { .. } => IMAGE_TOKENS,
                    };
                }
            }
            None => {}
        }
        if message.name.is_some() {
            tokens += TOKENS_PER_NAME;
        }
        if let Some(tool_calls) = &message.tool_calls {
            for call in tool_calls {
                tokens += self.text_tokens(&call.arguments);
            }
        }
        tokens
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(
        &self,
        _model: Option<&str>,
        messages: Option<&[ChatMessage]>,
        text: Option<&str>,
    ) -> u64 {
        if let Some(messages) = messages.filter(|m| !m.is_empty()) {
            let sum: u64 = messages.iter().map(|m| self.message_tokens(m)).sum();
            return sum + REPLY_PRIMING;
        }
        if let Some(text) = text {
            return self.text_tokens(text);
        }
        0
    }
}
