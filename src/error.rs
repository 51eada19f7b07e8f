//! Error types for chat completion calls

use crate::config::ConfigError;

/// Errors surfaced by [`crate::ChatClient`]
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Credentials were rejected (HTTP 401/403)
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Network failure, timeout or unreadable body
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The request could not be assembled
    #[error("invalid request: {0}")]
    Request(#[from] async_openai::error::OpenAIError),
}

/// The provider answered, but not with a usable completion
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Error object delivered inside a successful response or stream
    #[error("{message}")]
    Api { message: String },

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response contained no completion content")]
    Empty,
}

impl ChatError {
    /// Map a non-success HTTP status and its body to an error
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = extract_error_message(body);
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => ChatError::Auth {
                status: status.as_u16(),
                message,
            },
            _ => ChatError::Provider(ProviderError::Status {
                status: status.as_u16(),
                message,
            }),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ChatError::Auth { .. })
    }
}

/// Pull a readable message out of an error body.
///
/// Understands `{"error": {"message": ..., "code": ...}}`, `{"error": "..."}`
/// and `{"message": ...}`; anything else is returned trimmed as-is.
pub(crate) fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return trimmed.to_string();
    };

    if let Some(error) = json.get("error") {
        return describe_error_value(error);
    }

    json.get("message")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Describe the value of an `"error"` field
pub(crate) fn describe_error_value(error: &serde_json::Value) -> String {
    if let Some(msg) = error.get("message").and_then(|v| v.as_str()) {
        return match error.get("code").and_then(|v| v.as_str()) {
            Some(code) => format!("{} (code: {})", msg, code),
            None => msg.to_string(),
        };
    }
    match error.as_str() {
        Some(msg) => msg.to_string(),
        None => error.to_string(),
    }
}
