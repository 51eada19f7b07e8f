//! Chat model abstraction
//!
//! A provider-agnostic view of "something that answers a conversation",
//! so callers can pass a prompt without building messages or headers.

use crate::error::ChatError;
use crate::message::Message;
use crate::provider::ChatClient;
use async_trait::async_trait;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier sent to the provider
    fn model_name(&self) -> &str;

    /// Answer a full conversation
    async fn generate(&self, messages: &[Message]) -> Result<String, ChatError>;

    /// Answer a single user prompt
    async fn invoke(&self, prompt: &str) -> Result<String, ChatError> {
        self.generate(&[Message::user(prompt)]).await
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    fn model_name(&self) -> &str {
        self.config().model()
    }

    async fn generate(&self, messages: &[Message]) -> Result<String, ChatError> {
        self.complete(messages, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use std::sync::Mutex;

    /// Records what it was asked and answers with a fixed reply
    struct RecordingModel {
        seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        fn model_name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, messages: &[Message]) -> Result<String, ChatError> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok("LangChain is a framework for LLM applications.".to_string())
        }
    }

    #[tokio::test]
    async fn test_invoke_wraps_prompt_as_user_message() {
        let model = RecordingModel {
            seen: Mutex::new(Vec::new()),
        };
        let answer = model.invoke("什么是LangChain?").await.unwrap();
        assert_eq!(answer, "LangChain is a framework for LLM applications.");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].role(), Role::User);
        assert_eq!(seen[0].content(), "什么是LangChain?");
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let model: Box<dyn ChatModel> = Box::new(RecordingModel {
            seen: Mutex::new(Vec::new()),
        });
        assert_eq!(model.model_name(), "recording");
        assert!(model.invoke("hi").await.is_ok());
    }

    #[test]
    fn test_client_reports_configured_model() {
        let config = crate::Config::new("http://localhost:1", "k", "doubao-1-5-pro-32k-250115").unwrap();
        let client = ChatClient::new(config).unwrap();
        assert_eq!(client.model_name(), "doubao-1-5-pro-32k-250115");
    }
}
