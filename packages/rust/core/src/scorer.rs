//! Batch scorer: raw feed records to a ranked list of [`ScoredOpportunity`].

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{info, instrument, warn};

use bidcraft_provider::{CompletionRequest, ModelProvider};
use bidcraft_shared::{ParseFailure, RawRecord, Result, ScoredOpportunity};

use crate::executor::{self, pretty_json};
use crate::prompts::{SCORE_SYSTEM, score_user};

/// Records beyond this many are dropped before the prompt is built.
pub const MAX_SCORED_RECORDS: usize = 30;

/// What the scoring step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    /// Every element met the contract; sorted by `pursuit_score`, highest first.
    Ranked(Vec<ScoredOpportunity>),
    /// Valid JSON that was not an array, passed through unchanged.
    Unranked(Value),
    /// Unparseable reply, or an element that broke the contract.
    Failed(ParseFailure),
}

impl ScoreOutcome {
    /// The ranked list, if the reply was one.
    pub fn ranked(&self) -> Option<&[ScoredOpportunity]> {
        match self {
            Self::Ranked(items) => Some(items),
            _ => None,
        }
    }
}

impl Default for ScoreOutcome {
    fn default() -> Self {
        Self::Ranked(Vec::new())
    }
}

// On the wire a failure is a one-element list, so clients can always iterate `scored`.
impl Serialize for ScoreOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Ranked(items) => items.serialize(serializer),
            Self::Unranked(value) => value.serialize(serializer),
            Self::Failed(failure) => [failure].serialize(serializer),
        }
    }
}

/// Score a batch of records for pursuit priority.
///
/// An empty batch returns immediately without a model call.
#[instrument(skip_all, fields(records = records.len()))]
pub async fn score_opportunities(
    provider: &dyn ModelProvider,
    records: &[RawRecord],
    max_tokens: u32,
) -> Result<ScoreOutcome> {
    if records.is_empty() {
        return Ok(ScoreOutcome::default());
    }

    let sample = &records[..records.len().min(MAX_SCORED_RECORDS)];
    if sample.len() < records.len() {
        info!(kept = sample.len(), dropped = records.len() - sample.len(), "truncating scoring batch");
    }

    let request = CompletionRequest::new(SCORE_SYSTEM, score_user(&pretty_json(&sample)?), max_tokens);
    let raw = provider.complete(&request).await?;
    let outcome = rank_reply(&raw);

    match &outcome {
        ScoreOutcome::Ranked(items) => info!(scored = items.len(), "batch scored"),
        ScoreOutcome::Unranked(_) => warn!("scoring reply was not an array; passing through"),
        ScoreOutcome::Failed(_) => warn!("scoring reply could not be parsed"),
    }
    Ok(outcome)
}

/// Interpret a scoring reply and sort it, highest score first.
pub fn rank_reply(raw: &str) -> ScoreOutcome {
    let value = match executor::parse_json(raw) {
        Ok(value) => value,
        Err(_) => return ScoreOutcome::Failed(ParseFailure::from_raw(raw)),
    };
    let Value::Array(elements) = value else {
        return ScoreOutcome::Unranked(value);
    };

    let items: Result<Vec<ScoredOpportunity>> = elements.into_iter().map(executor::conform).collect();
    match items {
        Ok(mut items) => {
            // Stable: equal scores keep the model's order.
            items.sort_by(|a, b| b.pursuit_score.cmp(&a.pursuit_score));
            ScoreOutcome::Ranked(items)
        }
        Err(e) => {
            warn!(error = %e, "scored element broke its contract");
            ScoreOutcome::Failed(ParseFailure::from_raw(raw))
        }
    }
}
