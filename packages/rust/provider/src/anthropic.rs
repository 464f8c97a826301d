//! Anthropic Messages API client.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use bidcraft_shared::{AnthropicConfig, BidcraftError, Result};

use crate::sse::{SseDecoder, SseEvent};
use crate::{CompletionRequest, FragmentStream, ModelProvider, StreamItem};

/// API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("Bidcraft/", env!("CARGO_PKG_VERSION"));

/// Characters of an upstream error body kept in error messages.
const ERROR_BODY_CHARS: usize = 300;

/// [`ModelProvider`] backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    /// Build a provider from config and an already-resolved API key.
    pub fn new(config: &AnthropicConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| BidcraftError::provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": [{"role": "user", "content": request.user}],
            "stream": stream,
        })
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.body(request, stream));
        if stream {
            builder = builder.header("accept", "text/event-stream");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BidcraftError::provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_CHARS).collect();
            warn!(%status, "model provider returned an error status");
            return Err(BidcraftError::provider(format!("HTTP {status}: {body}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    #[instrument(skip_all, fields(model = %self.model, max_tokens = request.max_tokens))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let response = self.send(request, false).await?;

        let message: MessagesResponse = response
            .json()
            .await
            .map_err(|e| BidcraftError::provider(format!("invalid response body: {e}")))?;

        let text: String = message
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            return Err(BidcraftError::provider("model returned no text content"));
        }

        debug!(
            stop_reason = message.stop_reason.as_deref().unwrap_or("unknown"),
            chars = text.len(),
            "completion received"
        );

        Ok(text.trim().to_string())
    }

    #[instrument(skip_all, fields(model = %self.model, max_tokens = request.max_tokens))]
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream> {
        let response = self.send(request, true).await?;
        debug!("streaming session opened");
        Ok(into_fragments(response.bytes_stream().boxed()))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// The subset of streaming event payloads we act on.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamPayload {
    ContentBlockDelta { delta: Delta },
    MessageDelta { delta: MessageDelta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// Streaming state machine
// ---------------------------------------------------------------------------

struct StreamState {
    upstream: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    ready: VecDeque<Result<StreamItem>>,
    stop_reason: Option<String>,
    finished: bool,
}

impl StreamState {
    fn handle(&mut self, event: SseEvent) {
        let payload: StreamPayload = match serde_json::from_str(&event.data) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, event = ?event.event, "skipping undecodable stream event");
                return;
            }
        };

        match payload {
            StreamPayload::ContentBlockDelta {
                delta: Delta::TextDelta { text },
            } => self.ready.push_back(Ok(StreamItem::Text(text))),
            StreamPayload::MessageDelta { delta } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
            }
            StreamPayload::MessageStop => self.ready.push_back(Ok(StreamItem::Stop {
                stop_reason: self.stop_reason.take(),
            })),
            StreamPayload::Error { error } => self.ready.push_back(Err(BidcraftError::provider(
                format!("{}: {}", error.kind, error.message),
            ))),
            StreamPayload::ContentBlockDelta { .. } | StreamPayload::Other => {}
        }
    }
}

/// Turn an upstream SSE byte stream into ordered fragments.
///
/// Ends after `message_stop` or the first error. An upstream that closes
/// without `message_stop` yields an error, never a silent end.
fn into_fragments(upstream: BoxStream<'static, reqwest::Result<Bytes>>) -> FragmentStream {
    let state = StreamState {
        upstream,
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        stop_reason: None,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }
            if let Some(item) = state.ready.pop_front() {
                if matches!(item, Ok(StreamItem::Stop { .. }) | Err(_)) {
                    state.finished = true;
                }
                return Some((item, state));
            }

            match state.upstream.next().await {
                Some(Ok(chunk)) => {
                    for event in state.decoder.push(&chunk) {
                        state.handle(event);
                    }
                }
                Some(Err(e)) => state
                    .ready
                    .push_back(Err(BidcraftError::provider(format!("stream aborted: {e}")))),
                None => {
                    let message = if state.decoder.has_pending() {
                        "stream closed mid-event before message_stop"
                    } else {
                        "stream closed before message_stop"
                    };
                    state.ready.push_back(Err(BidcraftError::provider(message)));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> AnthropicProvider {
        let config = AnthropicConfig {
            base_url: server.uri(),
            ..AnthropicConfig::default()
        };
        AnthropicProvider::new(&config, "test-key").unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("system", "user", 128)
    }

    fn sse(events: &[(&str, serde_json::Value)]) -> String {
        events
            .iter()
            .map(|(name, data)| format!("event: {name}\ndata: {data}\n\n"))
            .collect()
    }

    async fn collect(stream: FragmentStream) -> Vec<Result<StreamItem>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn complete_returns_joined_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({"max_tokens": 128, "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "  {\"ok\": true}\n"}],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let text = provider_for(&server).complete(&request()).await.unwrap();
        assert_eq!(text, r#"{"ok": true}"#);
    }

    #[tokio::test]
    async fn complete_maps_error_status_to_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, BidcraftError::Provider(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn stream_yields_fragments_then_stop() {
        let body = sse(&[
            ("message_start", json!({"type": "message_start", "message": {}})),
            ("content_block_start", json!({"type": "content_block_start", "index": 0})),
            ("ping", json!({"type": "ping"})),
            (
                "content_block_delta",
                json!({"type": "content_block_delta", "index": 0,
                       "delta": {"type": "text_delta", "text": "Hello, "}}),
            ),
            (
                "content_block_delta",
                json!({"type": "content_block_delta", "index": 0,
                       "delta": {"type": "text_delta", "text": "world."}}),
            ),
            ("content_block_stop", json!({"type": "content_block_stop", "index": 0})),
            (
                "message_delta",
                json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}}),
            ),
            ("message_stop", json!({"type": "message_stop"})),
        ]);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let items = collect(provider_for(&server).stream(&request()).await.unwrap()).await;
        let items: Vec<StreamItem> = items.into_iter().map(|i| i.unwrap()).collect();
        assert_eq!(
            items,
            vec![
                StreamItem::Text("Hello, ".into()),
                StreamItem::Text("world.".into()),
                StreamItem::Stop {
                    stop_reason: Some("end_turn".into())
                },
            ]
        );
    }

    #[tokio::test]
    async fn stream_error_event_terminates_with_error() {
        let body = sse(&[
            (
                "content_block_delta",
                json!({"type": "content_block_delta", "index": 0,
                       "delta": {"type": "text_delta", "text": "partial"}}),
            ),
            (
                "error",
                json!({"type": "error",
                       "error": {"type": "overloaded_error", "message": "Overloaded"}}),
            ),
            (
                "content_block_delta",
                json!({"type": "content_block_delta", "index": 0,
                       "delta": {"type": "text_delta", "text": "never seen"}}),
            ),
        ]);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let items = collect(provider_for(&server).stream(&request()).await.unwrap()).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &StreamItem::Text("partial".into()));
        let err = items[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("overloaded_error"));
    }

    #[tokio::test]
    async fn stream_without_message_stop_is_an_error() {
        let body = sse(&[(
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0,
                   "delta": {"type": "text_delta", "text": "cut"}}),
        )]);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let items = collect(provider_for(&server).stream(&request()).await.unwrap()).await;
        assert_eq!(items.len(), 2);
        let err = items[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("stream closed before message_stop"));
    }

    #[tokio::test]
    async fn stream_cut_inside_an_event_is_reported() {
        let mut body = sse(&[(
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0,
                   "delta": {"type": "text_delta", "text": "cut"}}),
        )]);
        body.push_str("event: content_block_delta\ndata: {\"type\": \"content_blo");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let items = collect(provider_for(&server).stream(&request()).await.unwrap()).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(StreamItem::Text(t)) if t == "cut"));
        let err = items[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("stream closed mid-event"));
    }
}
