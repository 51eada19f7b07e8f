//! Response types
//!
//! Parsed leniently: only the fields we read are required, so providers that
//! omit `id`, `created` or `object` still work.

use crate::error::{describe_error_value, ChatError, ProviderError};
use serde::{Deserialize, Serialize};

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Result of a non-streaming completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Assistant text of the first choice
    pub text: String,
    /// Model that served the request, as reported by the provider
    pub model: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<Usage>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Parse a non-streaming response body
pub(crate) fn parse_completion(body: &str) -> Result<Completion, ChatError> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(ProviderError::Malformed)?;

    if let Some(error) = response.error.filter(|e| !e.is_null()) {
        return Err(ProviderError::Api {
            message: describe_error_value(&error),
        }
        .into());
    }

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(ProviderError::Empty)?;
    let text = choice
        .message
        .and_then(|m| m.content)
        .ok_or(ProviderError::Empty)?;

    Ok(Completion {
        text,
        model: response.model,
        finish_reason: choice.finish_reason,
        usage: response.usage,
    })
}

/// One `data:` payload of a streaming response
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    pub usage: Option<Usage>,
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    pub delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    pub content: Option<String>,
}

impl StreamChunk {
    /// Non-empty text fragments carried by this chunk, in choice order
    pub(crate) fn fragments(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .filter_map(|c| c.delta.as_ref()?.content.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub(crate) fn error_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .filter(|e| !e.is_null())
            .map(describe_error_value)
    }
}
