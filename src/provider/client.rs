//! OpenAI-compatible chat completions client
//!
//! Requests are built with async-openai's types and sent over raw HTTP so
//! extra headers and status codes stay under our control.

use super::request::build_request;
use super::response::{parse_completion, Completion};
use super::stream::{fragment_stream, FragmentStream};
use crate::config::Config;
use crate::error::ChatError;
use crate::message::Message;
use async_openai::types::CreateChatCompletionRequest;
use reqwest::header::HeaderMap;
use std::time::{Duration, Instant};

/// Upper bound on establishing a connection, for both call styles
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for one configured chat completions endpoint
#[derive(Clone)]
pub struct ChatClient {
    config: Config,
    http_client: reqwest::Client,
}

impl ChatClient {
    /// Create a new client from a validated config
    pub fn new(config: Config) -> Result<Self, ChatError> {
        let http_client = http_client_builder(&config).build()?;
        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a client that sends through a caller-supplied HTTP client
    pub fn with_http_client(config: Config, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Load configuration from the environment and build a client.
    /// Fails before any network activity if a required variable is missing.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::new(Config::from_env()?)
    }

    /// Same as [`ChatClient::from_env`] with an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(Config::from_lookup(lookup)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send the conversation and wait for the full reply; returns the assistant text
    pub async fn complete(
        &self,
        messages: &[Message],
        extra_headers: Option<&HeaderMap>,
    ) -> Result<String, ChatError> {
        Ok(self.create(messages, extra_headers).await?.text)
    }

    /// Send the conversation and wait for the full reply, keeping metadata
    pub async fn create(
        &self,
        messages: &[Message],
        extra_headers: Option<&HeaderMap>,
    ) -> Result<Completion, ChatError> {
        let model = self.config.model();
        let request = build_request(model, messages, false)?;

        let start = Instant::now();
        tracing::info!(
            target: "llm",
            model = model,
            message_count = messages.len(),
            "Starting LLM call"
        );

        let response = self
            .post(&request, extra_headers)
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "llm", error = %e, "LLM call failed");
                ChatError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        let elapsed = start.elapsed();

        if !status.is_success() {
            let err = ChatError::from_status(status, &body);
            tracing::error!(
                target: "llm",
                status = %status,
                error = %err,
                elapsed_ms = elapsed.as_millis() as u64,
                "LLM call returned error"
            );
            return Err(err);
        }

        let completion = parse_completion(&body).inspect_err(|e| {
            tracing::error!(target: "llm", error = %e, "Unusable LLM response");
        })?;

        tracing::info!(
            target: "llm",
            model = model,
            elapsed_ms = elapsed.as_millis() as u64,
            input_tokens = completion.usage.map(|u| u.prompt_tokens),
            output_tokens = completion.usage.map(|u| u.completion_tokens),
            finish_reason = completion.finish_reason.as_deref(),
            "LLM call completed"
        );

        Ok(completion)
    }

    /// Send the conversation and stream the reply as text fragments.
    ///
    /// Status errors (including rejected credentials) are returned here,
    /// before any fragment is produced.
    pub async fn stream_complete(
        &self,
        messages: &[Message],
        extra_headers: Option<&HeaderMap>,
    ) -> Result<FragmentStream, ChatError> {
        let model = self.config.model();
        let request = build_request(model, messages, true)?;

        tracing::info!(
            target: "llm",
            model = model,
            message_count = messages.len(),
            "Starting streaming LLM call"
        );
        let start = Instant::now();

        // No overall timeout: a long generation must not be cut off mid-stream
        let response = self
            .post(&request, extra_headers)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "llm", error = %e, "Streaming LLM call failed");
                ChatError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                tracing::debug!(target: "llm", error = %e, "Could not read error body");
                String::new()
            });
            let err = ChatError::from_status(status, &body);
            tracing::error!(target: "llm", status = %status, error = %err, "Streaming LLM call returned error");
            return Err(err);
        }

        Ok(fragment_stream(response.bytes_stream(), model, start))
    }

    fn post(
        &self,
        request: &CreateChatCompletionRequest,
        extra_headers: Option<&HeaderMap>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self
            .http_client
            .post(self.config.completions_url())
            .bearer_auth(self.config.api_key().expose())
            .json(request);

        if let Some(headers) = extra_headers {
            builder = builder.headers(headers.clone());
        }

        builder
    }
}

/// HTTP settings derived from the config.
///
/// `read_timeout` bounds each read, so a stalled stream fails while a long
/// generation that keeps sending is never cut off.
fn http_client_builder(config: &Config) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(config.timeout()))
        .read_timeout(config.timeout())
        .user_agent(concat!("ark-chat/", env!("CARGO_PKG_VERSION")))
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
