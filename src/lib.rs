//! Ark Chat - a thin client for OpenAI-compatible chat completion services
//!
//! This crate provides:
//! - Environment-driven configuration (endpoint, API key, model)
//! - Blocking and streaming chat completions over HTTP
//! - A `ChatModel` trait for prompt-in, text-out callers
//! - Logging setup shared by the binaries

pub mod config;
pub mod error;
pub mod message;
pub mod model;
pub mod provider;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use error::{ChatError, ProviderError};
pub use message::{Message, Role, Thread};
pub use model::ChatModel;
pub use provider::{
    collect_text, encryption_headers, forward_fragments, ChatClient, Completion, FragmentStream,
    Usage,
};
pub use telemetry::Telemetry;
