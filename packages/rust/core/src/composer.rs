//! Streaming composer: long-form prose delivered fragment by fragment.
//!
//! [`compose`] spawns a producer task that drives one provider streaming
//! session and pushes [`ComposeEvent`]s into a bounded channel. The caller
//! drains the returned [`ComposeStream`]. Every session ends with exactly one
//! terminal event, [`ComposeEvent::Done`] or [`ComposeEvent::Failed`], so a
//! consumer can always tell a clean finish from an aborted one. Dropping the
//! stream stops the producer, which drops the provider session with it.

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, debug, info, info_span, warn};

use bidcraft_provider::{CompletionRequest, ModelProvider, StreamItem};
use bidcraft_shared::{CapabilityMatch, Priority, Result, StructuredRequirements};

use crate::executor::pretty_json;
use crate::prompts::{BRIEF_SYSTEM, DRAFT_SYSTEM, brief_user, draft_user};

/// Scored entries included in a brief prompt.
pub const MAX_BRIEF_ITEMS: usize = 15;

/// Fragments buffered between the producer and a slow consumer.
const CHANNEL_CAPACITY: usize = 32;

/// One event of a composing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeEvent {
    /// A text fragment, in provider-delivery order.
    Text(String),
    /// The provider finished normally.
    Done { stop_reason: Option<String> },
    /// The session failed. No further events follow.
    Failed { message: String },
}

impl ComposeEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Text(_))
    }
}

/// Finite, non-restartable sequence of [`ComposeEvent`]s.
pub type ComposeStream = ReceiverStream<ComposeEvent>;

/// Open a streaming session and forward its fragments.
///
/// Never fails up front: errors opening the session arrive as
/// [`ComposeEvent::Failed`]. Must be called inside a Tokio runtime.
pub fn compose(provider: Arc<dyn ModelProvider>, request: CompletionRequest) -> ComposeStream {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let span = info_span!("compose", max_tokens = request.max_tokens);

    tokio::spawn(
        async move {
            tokio::select! {
                _ = tx.closed() => debug!("consumer went away; closing provider session"),
                _ = produce(provider.as_ref(), &request, &tx) => {}
            }
        }
        .instrument(span),
    );

    ReceiverStream::new(rx)
}

async fn produce(provider: &dyn ModelProvider, request: &CompletionRequest, tx: &mpsc::Sender<ComposeEvent>) {
    let mut fragments = match provider.stream(request).await {
        Ok(fragments) => fragments,
        Err(e) => {
            warn!(error = %e, "could not open streaming session");
            let _ = tx.send(ComposeEvent::Failed { message: e.to_string() }).await;
            return;
        }
    };

    let mut sent = 0usize;
    let terminal = loop {
        match fragments.next().await {
            Some(Ok(StreamItem::Text(text))) => {
                if tx.send(ComposeEvent::Text(text)).await.is_err() {
                    return;
                }
                sent += 1;
            }
            Some(Ok(StreamItem::Stop { stop_reason })) => {
                info!(fragments = sent, stop_reason = stop_reason.as_deref().unwrap_or("unknown"), "composition finished");
                break ComposeEvent::Done { stop_reason };
            }
            Some(Err(e)) => {
                warn!(fragments = sent, error = %e, "stream failed mid-composition");
                break ComposeEvent::Failed { message: e.to_string() };
            }
            None => {
                warn!(fragments = sent, "stream closed without a stop signal");
                break ComposeEvent::Failed {
                    message: "model stream ended unexpectedly".to_string(),
                };
            }
        }
    };
    let _ = tx.send(terminal).await;
}

// ---------------------------------------------------------------------------
// Proposal draft
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DraftRequirements<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    program_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agency: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    technical_requirements: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation_criteria: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deliverables: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    period_of_performance: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    set_aside: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_themes: Option<&'a [String]>,
}

#[derive(Serialize)]
struct DraftCapability<'a> {
    capability_name: Option<&'a str>,
    key_differentiators: &'a [String],
}

#[derive(Serialize)]
struct DraftMatch<'a> {
    primary_capabilities: Vec<DraftCapability<'a>>,
    win_themes: &'a [String],
    coverage_gaps: &'a [String],
    recommended_teaming: &'a str,
}

/// Build the draft prompt from prose-relevant fields only.
pub fn draft_request(
    requirements: &StructuredRequirements,
    matched: &CapabilityMatch,
    max_tokens: u32,
) -> Result<CompletionRequest> {
    let program = requirements.program_name.as_deref().unwrap_or("This Opportunity");
    let agency = requirements.agency.as_deref().unwrap_or("the Government");

    let slim_requirements = DraftRequirements {
        program_name: requirements.program_name.as_deref(),
        agency: requirements.agency.as_deref(),
        technical_requirements: requirements.technical_requirements.as_deref(),
        evaluation_criteria: requirements.evaluation_criteria.as_deref(),
        deliverables: requirements.deliverables.as_deref(),
        period_of_performance: requirements.period_of_performance.as_deref(),
        set_aside: requirements.set_aside.as_deref(),
        key_themes: requirements.key_themes.as_deref(),
    };
    let slim_match = DraftMatch {
        primary_capabilities: matched
            .primary_capabilities
            .iter()
            .map(|c| DraftCapability {
                capability_name: c.capability_name.as_deref(),
                key_differentiators: &c.key_differentiators,
            })
            .collect(),
        win_themes: &matched.win_themes,
        coverage_gaps: &matched.coverage_gaps,
        recommended_teaming: matched.recommended_teaming.as_deref().unwrap_or(""),
    };

    let user = draft_user(
        program,
        agency,
        &pretty_json(&slim_requirements)?,
        &pretty_json(&slim_match)?,
    );
    Ok(CompletionRequest::new(DRAFT_SYSTEM, user, max_tokens))
}

// ---------------------------------------------------------------------------
// BD brief
// ---------------------------------------------------------------------------

/// The first [`MAX_BRIEF_ITEMS`] entries with an actionable priority, in input order.
pub fn top_actionable(scored: &[Value]) -> Vec<&Value> {
    scored
        .iter()
        .filter(|item| {
            item.get("priority")
                .and_then(|p| Priority::deserialize(p).ok())
                .is_some_and(Priority::is_actionable)
        })
        .take(MAX_BRIEF_ITEMS)
        .collect()
}

/// Build the brief prompt from scored entries and market context.
pub fn brief_request(
    scored: &[Value],
    market_context: &str,
    focus_areas: &[String],
    max_tokens: u32,
) -> Result<CompletionRequest> {
    let areas = if focus_areas.is_empty() {
        "all focus areas".to_string()
    } else {
        focus_areas.join(", ")
    };
    let top = top_actionable(scored);
    debug!(selected = top.len(), offered = scored.len(), "brief items selected");

    let user = brief_user(&areas, &pretty_json(&top)?, market_context);
    Ok(CompletionRequest::new(BRIEF_SYSTEM, user, max_tokens))
}
