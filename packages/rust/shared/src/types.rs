//! Core domain types exchanged between pipeline steps.
//!
//! Everything here is request-scoped: built from a feed or a model reply,
//! handed to the next step, then dropped.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Number of characters of a raw model reply kept in a [`ParseFailure`].
pub const PARSE_FAILURE_PREFIX_CHARS: usize = 300;

/// A heterogeneous record projected from an external feed (opportunity or award).
pub type RawRecord = Map<String, Value>;

// ---------------------------------------------------------------------------
// Field contracts
// ---------------------------------------------------------------------------

/// The output contract a model reply must satisfy before it is handed on.
pub trait Contract: serde::de::DeserializeOwned {
    /// Keys that must be present in the reply object (values may be `null`).
    const REQUIRED_KEYS: &'static [&'static str];

    /// Semantic checks that serde cannot express (ranges, enums in free text).
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Explicit marker for a model reply that failed its contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    /// The first [`PARSE_FAILURE_PREFIX_CHARS`] characters of the raw reply.
    pub parse_error: String,
}

impl ParseFailure {
    /// Build a marker from the raw reply, truncated on a char boundary.
    pub fn from_raw(raw: &str) -> Self {
        Self {
            parse_error: raw.chars().take(PARSE_FAILURE_PREFIX_CHARS).collect(),
        }
    }
}

/// Result of a structured step: a validated value or a parse-failure marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Parsed<T> {
    Valid(T),
    Failed(ParseFailure),
}

impl<T> Parsed<T> {
    /// The validated value, if any.
    pub fn valid(&self) -> Option<&T> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// ---------------------------------------------------------------------------
// StructuredRequirements
// ---------------------------------------------------------------------------

/// Structure extracted from an RFP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredRequirements {
    pub program_name: Option<String>,
    pub agency: Option<String>,
    pub solicitation_number: Option<String>,
    pub naics_codes: Option<Vec<String>>,
    pub technical_requirements: Option<Vec<String>>,
    pub evaluation_criteria: Option<Vec<String>>,
    pub deliverables: Option<Vec<String>>,
    pub period_of_performance: Option<String>,
    pub set_aside: Option<String>,
    pub key_themes: Option<Vec<String>>,
}

impl Contract for StructuredRequirements {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "program_name",
        "agency",
        "solicitation_number",
        "naics_codes",
        "technical_requirements",
        "evaluation_criteria",
        "deliverables",
        "period_of_performance",
        "set_aside",
        "key_themes",
    ];
}

// ---------------------------------------------------------------------------
// CapabilityMatch
// ---------------------------------------------------------------------------

/// One company capability aligned to the RFP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchedCapability {
    pub capability_name: Option<String>,
    pub relevance_score: Option<u8>,
    pub why_relevant: Option<String>,
    pub key_differentiators: Vec<String>,
}

/// Relevance and gap report produced by the matcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityMatch {
    pub primary_capabilities: Vec<MatchedCapability>,
    pub coverage_gaps: Vec<String>,
    pub win_themes: Vec<String>,
    pub recommended_teaming: Option<String>,
}

impl Contract for CapabilityMatch {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "primary_capabilities",
        "coverage_gaps",
        "win_themes",
        "recommended_teaming",
    ];

    fn validate(&self) -> Result<(), String> {
        for cap in &self.primary_capabilities {
            if let Some(score) = cap.relevance_score {
                if !(1..=10).contains(&score) {
                    return Err(format!(
                        "relevance_score {score} out of range for {:?}",
                        cap.capability_name
                    ));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScoredOpportunity
// ---------------------------------------------------------------------------

/// Pursuit priority assigned by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
    Monitor,
}

impl Priority {
    /// Whether the composer should brief on this item.
    pub fn is_actionable(self) -> bool {
        matches!(self, Self::High | Self::Medium)
    }
}

/// A scored opportunity or award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOpportunity {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub pursuit_score: u8,
    pub priority: Priority,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub key_factors: Vec<String>,
    #[serde(default)]
    pub estimated_value_m: Option<f64>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub agency_short: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub naics: Option<String>,
    #[serde(default)]
    pub set_aside: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    /// Keys the model added beyond the known fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contract for ScoredOpportunity {
    const REQUIRED_KEYS: &'static [&'static str] = &["id", "pursuit_score", "priority"];

    fn validate(&self) -> Result<(), String> {
        if !(1..=10).contains(&self.pursuit_score) {
            return Err(format!(
                "pursuit_score {} out of range for {:?}",
                self.pursuit_score, self.id
            ));
        }
        Ok(())
    }
}

/// Accept identifiers and NAICS codes the model emits as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
