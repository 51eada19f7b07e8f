//! Request construction

use crate::message::{to_request_messages, Message};
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionStreamOptions, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use reqwest::header::{HeaderMap, HeaderValue};

/// Ark opt-in header for application-layer encryption of the inference session
pub const ENCRYPTION_HEADER: &str = "x-is-encrypted";

/// Extra headers that enable Ark's encrypted inference session
pub fn encryption_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ENCRYPTION_HEADER, HeaderValue::from_static("true"));
    headers
}

/// Build the chat completions request body.
/// Streaming requests also ask for a trailing usage chunk.
pub(crate) fn build_request(
    model: &str,
    messages: &[Message],
    stream: bool,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let mut builder = CreateChatCompletionRequestArgs::default();
    builder
        .model(model)
        .messages(to_request_messages(messages)?)
        .stream(stream);

    if stream {
        builder.stream_options(ChatCompletionStreamOptions {
            include_usage: true,
        });
    }

    builder.build()
}
