//! Server-Sent Events framing for composer output.
//!
//! Wire contract: one `data: {"text": ...}` frame per fragment, a
//! `data: {"error": ...}` frame if the session failed, then always a final
//! `data: [DONE]` frame.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;

use bidcraft_core::{ComposeEvent, ComposeStream};

const DONE_FRAME: &str = "data: [DONE]\n\n";

fn data_frame(payload: &serde_json::Value) -> String {
    format!("data: {payload}\n\n")
}

/// Encode one composer event as SSE bytes.
pub(crate) fn frame(event: ComposeEvent) -> Bytes {
    match event {
        ComposeEvent::Text(text) => Bytes::from(data_frame(&json!({ "text": text }))),
        ComposeEvent::Done { .. } => Bytes::from_static(DONE_FRAME.as_bytes()),
        ComposeEvent::Failed { message } => {
            Bytes::from(format!("{}{DONE_FRAME}", data_frame(&json!({ "error": message }))))
        }
    }
}

/// Stream composer events to the client. Dropping the body drops the
/// composer stream, which closes the provider session.
pub(crate) fn sse_response(events: ComposeStream) -> Response {
    let body = Body::from_stream(events.map(|event| Ok::<_, Infallible>(frame(event))));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_is_json_escaped() {
        let bytes = frame(ComposeEvent::Text("line \"one\"\n".into()));
        assert_eq!(&bytes[..], b"data: {\"text\":\"line \\\"one\\\"\\n\"}\n\n");
    }

    #[test]
    fn done_frame_omits_stop_reason() {
        let bytes = frame(ComposeEvent::Done {
            stop_reason: Some("max_tokens".into()),
        });
        assert_eq!(&bytes[..], DONE_FRAME.as_bytes());
    }

    #[test]
    fn failure_frame_precedes_done() {
        let bytes = frame(ComposeEvent::Failed {
            message: "provider error: overloaded".into(),
        });
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "data: {\"error\":\"provider error: overloaded\"}\n\ndata: [DONE]\n\n"
        );
    }
}
