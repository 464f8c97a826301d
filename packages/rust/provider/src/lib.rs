//! Model-provider capability for Bidcraft.
//!
//! Pipeline steps never talk to an HTTP client directly. They receive a
//! [`ModelProvider`] handle, which the server builds once at startup
//! ([`AnthropicProvider`]) and tests replace with a scripted fake.

mod anthropic;
mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;

use bidcraft_shared::Result;

pub use anthropic::{ANTHROPIC_VERSION, AnthropicProvider};
pub use sse::{SseDecoder, SseEvent};

/// A single model call: system instruction, user message, output ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens,
        }
    }
}

/// One item of a streaming session, in provider-delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// A text fragment.
    Text(String),
    /// The provider signalled end-of-stream. Always the last item.
    Stop { stop_reason: Option<String> },
}

/// Fragments of a streaming session.
///
/// The stream ends after a [`StreamItem::Stop`] or after the first `Err`.
/// Dropping it closes the underlying provider connection.
pub type FragmentStream = BoxStream<'static, Result<StreamItem>>;

/// The request/response and streaming model calls every pipeline step uses.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Run one non-streaming call and return the reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Open a streaming session.
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream>;
}
