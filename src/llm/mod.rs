//! Remote chat-completion providers.
//!
//! The dashboard can forward a question to one of several hosted chat APIs
//! instead of answering it with the local heuristics. This module holds
//! everything needed to do that:
//!
//! - [`registry`]: the table of named providers, their endpoints, default
//!   models and wire formats.
//! - [`wire`]: one [`wire::ChatWire`] implementation per request/response
//!   dialect (OpenAI-style, Anthropic messages, Gemini contents).
//! - [`transport`]: the blocking HTTP seam, backed by `ureq`.
//! - [`adapter`]: turns a question into a vendor request, sends it and pulls
//!   the reply text back out.
//! - [`probe`]: connection tests and the DeepSeek endpoint probe.
//!
//! Errors are reported as [`ProviderError`]; the dispatcher decides which of
//! them fall back to local analysis.

pub mod adapter;
pub mod error;
pub mod probe;
pub mod prompts;
pub mod registry;
pub mod secret;
pub mod transport;
pub mod wire;

pub use adapter::{RemoteAdapter, RemoteCall, RemoteSettings};
pub use error::ProviderError;
pub use registry::{LOCAL_PROVIDER, ProviderConfig, ProviderRegistry};
pub use secret::Secret;
pub use transport::{HttpRequest, HttpResponse, Transport, UreqTransport};

use serde::{Deserialize, Serialize};

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}
