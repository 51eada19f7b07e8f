//! LLM Provider layer
//!
//! Client for any endpoint implementing the OpenAI chat completions API,
//! with blocking and streaming calls.

mod client;
mod request;
mod response;
pub mod sse;
mod stream;

#[cfg(test)]
mod test_server;

pub use client::*;
pub use request::{encryption_headers, ENCRYPTION_HEADER};
pub use response::{Completion, Usage};
pub use stream::{collect_text, forward_fragments, FragmentStream};
