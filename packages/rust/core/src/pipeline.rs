//! End-to-end pipelines: extract → match → draft, and score → brief.
//!
//! Steps run strictly in sequence; each step's output is the next step's
//! input. The orchestrators here own cross-step error handling: which
//! failures abort a request and which are downgraded to status strings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use bidcraft_feeds::{
    AwardQuery, SamClient, SamQuery, UsaSpendingClient, codes_for, naics, normalize_awards,
    normalize_opportunities,
};
use bidcraft_provider::ModelProvider;
use bidcraft_shared::{
    BidcraftError, CapabilityMatch, FeedsConfig, MaxTokensConfig, Parsed, RawRecord, Result,
    StructuredRequirements,
};

use crate::composer::{self, ComposeStream};
use crate::extract::extract_requirements;
use crate::market::{self, MARKET_DATA_UNAVAILABLE};
use crate::matcher::match_capabilities;
use crate::scorer::{ScoreOutcome, score_opportunities};

/// RFP text beyond this many characters is cut before extraction.
pub const MAX_RFP_CHARS: usize = 200_000;

/// Appended to RFP text that was cut.
pub const TRUNCATION_MARKER: &str = "\n\n[... RFP TRUNCATED FOR CONTEXT LIMITS ...]";

/// Sub-agencies requested for the brief's market context.
const MARKET_AGENCY_LIMIT: u32 = 10;

/// Cut RFP text to [`MAX_RFP_CHARS`] characters. Returns the text and whether it was cut.
pub fn truncate_rfp(text: &str) -> (String, bool) {
    match text.char_indices().nth(MAX_RFP_CHARS) {
        None => (text.to_string(), false),
        Some((cut, _)) => (format!("{}{TRUNCATION_MARKER}", &text[..cut]), true),
    }
}

// ---------------------------------------------------------------------------
// Proposal pipeline
// ---------------------------------------------------------------------------

/// Result of `analyze`: extraction and (when extraction parsed) matching.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeOutcome {
    pub requirements: Parsed<StructuredRequirements>,
    /// `None` when extraction failed to parse and matching was skipped.
    pub matched: Option<Parsed<CapabilityMatch>>,
    pub truncated: bool,
    pub char_count: usize,
}

/// Proposal domain: RFP analysis and streamed proposal drafts.
pub struct ProposalPipeline {
    provider: Arc<dyn ModelProvider>,
    max_tokens: MaxTokensConfig,
}

impl ProposalPipeline {
    pub fn new(provider: Arc<dyn ModelProvider>, max_tokens: MaxTokensConfig) -> Self {
        Self { provider, max_tokens }
    }

    /// Extract requirements from RFP text, then match them to capabilities.
    #[instrument(skip_all, fields(chars = raw_text.len()))]
    pub async fn analyze(&self, raw_text: &str) -> Result<AnalyzeOutcome> {
        if raw_text.trim().is_empty() {
            return Err(BidcraftError::input("Provide either rfp_text or rfp_file."));
        }

        let (text, truncated) = truncate_rfp(raw_text);
        if truncated {
            info!(limit = MAX_RFP_CHARS, "RFP text truncated");
        }

        let requirements = extract_requirements(self.provider.as_ref(), &text, self.max_tokens.extract).await?;
        let matched = match requirements.valid() {
            Some(valid) => Some(match_capabilities(self.provider.as_ref(), valid, self.max_tokens.matching).await?),
            None => {
                warn!("skipping capability match: requirements did not parse");
                None
            }
        };

        Ok(AnalyzeOutcome {
            requirements,
            matched,
            truncated,
            char_count: text.chars().count(),
        })
    }

    /// Stream a proposal draft for analyzed requirements.
    pub fn draft(&self, requirements: &StructuredRequirements, matched: &CapabilityMatch) -> Result<ComposeStream> {
        let request = composer::draft_request(requirements, matched, self.max_tokens.draft)?;
        Ok(composer::compose(self.provider.clone(), request))
    }
}

// ---------------------------------------------------------------------------
// BD research pipeline
// ---------------------------------------------------------------------------

/// Parameters of a research run.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchParams {
    #[serde(default = "naics::all_focus_areas")]
    pub focus_areas: Vec<String>,
    /// Overrides the SAM.gov key configured at startup.
    #[serde(default)]
    pub sam_api_key: Option<String>,
    #[serde(default = "default_days_back")]
    pub days_back: i64,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// SAM.gov set-aside codes, e.g. `["SBA", "8A"]`.
    #[serde(default)]
    pub set_aside_filter: Option<Vec<String>>,
}

impl Default for ResearchParams {
    fn default() -> Self {
        Self {
            focus_areas: naics::all_focus_areas(),
            sam_api_key: None,
            days_back: default_days_back(),
            limit: default_limit(),
            set_aside_filter: None,
        }
    }
}

fn default_days_back() -> i64 {
    180
}
fn default_limit() -> u32 {
    25
}

/// Outcome of a research run. Partial data comes back with its errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchOutcome {
    pub scored: ScoreOutcome,
    pub raw_count: usize,
    pub naics_codes: Vec<String>,
    pub sam_status: String,
    pub errors: Vec<String>,
}

/// Parameters of a brief. Missing lists fall back to every focus area and code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BriefParams {
    #[serde(default)]
    pub scored: Vec<Value>,
    #[serde(default)]
    pub focus_areas: Option<Vec<String>>,
    #[serde(default)]
    pub naics_codes: Option<Vec<String>>,
}

/// BD-research domain: feed collection, scoring, and streamed briefs.
pub struct ResearchPipeline {
    provider: Arc<dyn ModelProvider>,
    usaspending: UsaSpendingClient,
    sam: SamClient,
    sam_api_key: Option<String>,
    days_posted: i64,
    max_tokens: MaxTokensConfig,
}

impl ResearchPipeline {
    /// Build feed clients from config. `sam_api_key` is the startup default.
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        feeds: &FeedsConfig,
        sam_api_key: Option<String>,
        max_tokens: MaxTokensConfig,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            usaspending: UsaSpendingClient::new(feeds)?,
            sam: SamClient::new(feeds)?,
            sam_api_key,
            days_posted: feeds.days_posted,
            max_tokens,
        })
    }

    /// Collect awards (required) and solicitations (optional), then score them.
    ///
    /// Fails only when no records were collected and at least one feed errored.
    #[instrument(skip_all, fields(focus_areas = params.focus_areas.len(), days_back = params.days_back))]
    pub async fn research(&self, params: &ResearchParams) -> Result<ResearchOutcome> {
        let naics_codes = codes_for(&params.focus_areas);
        let mut records: Vec<RawRecord> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        let award_query = AwardQuery {
            naics_codes: naics_codes.clone(),
            days_back: params.days_back,
            limit: params.limit,
        };
        match self.usaspending.fetch_recent_awards(&award_query).await {
            Ok(raw) => records.extend(normalize_awards(&raw)),
            Err(e) => {
                warn!(error = %e, "award search failed");
                errors.push(format!("USASpending.gov error: {}", detail(&e)));
            }
        }

        let sam_status = match self.sam_key(params) {
            None => "not_configured".to_string(),
            Some(key) => {
                let query = SamQuery {
                    naics_codes: naics_codes.clone(),
                    limit: params.limit,
                    set_aside_codes: params.set_aside_filter.clone(),
                    days_posted: self.days_posted,
                };
                match self.sam.fetch_opportunities(&query, key).await {
                    Ok(raw) => {
                        let opportunities = normalize_opportunities(&raw);
                        let status = format!("ok ({} opportunities)", opportunities.len());
                        records.extend(opportunities);
                        status
                    }
                    Err(e) => {
                        warn!(error = %e, "solicitation search failed");
                        let (status, message) = match e.http_status() {
                            Some(403) => ("invalid_key", "SAM.gov: Invalid or expired API key.".to_string()),
                            Some(code) => ("error", format!("SAM.gov HTTP {code}")),
                            None => ("error", format!("SAM.gov error: {}", detail(&e))),
                        };
                        errors.push(message);
                        status.to_string()
                    }
                }
            }
        };

        if records.is_empty() && !errors.is_empty() {
            return Err(BidcraftError::transport("data feeds", None, errors.join("; ")));
        }

        let scored = match score_opportunities(self.provider.as_ref(), &records, self.max_tokens.score).await {
            Ok(scored) => scored,
            Err(e) => {
                warn!(error = %e, "scoring failed");
                errors.push(format!("Scoring error: {e}"));
                ScoreOutcome::default()
            }
        };

        info!(raw = records.len(), errors = errors.len(), %sam_status, "research complete");
        Ok(ResearchOutcome {
            scored,
            raw_count: records.len(),
            naics_codes,
            sam_status,
            errors,
        })
    }

    /// Fetch market context and stream a BD brief for scored entries.
    #[instrument(skip_all, fields(scored = params.scored.len()))]
    pub async fn brief(&self, params: &BriefParams) -> Result<ComposeStream> {
        let focus_areas = params.focus_areas.clone().unwrap_or_else(naics::all_focus_areas);
        let naics_codes = params.naics_codes.clone().unwrap_or_else(naics::all_codes);

        let market_context = match self
            .usaspending
            .fetch_agency_spending(&naics_codes, MARKET_AGENCY_LIMIT)
            .await
        {
            Ok(spending) => market::build_market_context(&spending),
            Err(e) => {
                warn!(error = %e, "market spending unavailable");
                MARKET_DATA_UNAVAILABLE.to_string()
            }
        };

        let request = composer::brief_request(&params.scored, &market_context, &focus_areas, self.max_tokens.brief)?;
        Ok(composer::compose(self.provider.clone(), request))
    }

    /// The request's key when non-blank, else the configured one.
    fn sam_key<'a>(&'a self, params: &'a ResearchParams) -> Option<&'a str> {
        params
            .sam_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or_else(|| self.sam_api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()))
    }
}

/// The underlying message of a feed error, without the service prefix.
fn detail(err: &BidcraftError) -> String {
    match err {
        BidcraftError::Transport { message, .. } | BidcraftError::Input { message } => message.clone(),
        other => other.to_string(),
    }
}
