//! Capability matching: requirements plus the static catalog to a [`CapabilityMatch`].

use tracing::{info, instrument};

use bidcraft_provider::{CompletionRequest, ModelProvider};
use bidcraft_shared::{CapabilityMatch, Parsed, Result, StructuredRequirements};

use crate::catalog;
use crate::executor::{self, pretty_json};
use crate::prompts::{MATCH_SYSTEM, match_user};

/// Align extracted requirements with the company's capabilities.
///
/// The catalog is rendered fresh on every call.
#[instrument(skip_all, fields(program = requirements.program_name.as_deref().unwrap_or("unknown")))]
pub async fn match_capabilities(
    provider: &dyn ModelProvider,
    requirements: &StructuredRequirements,
    max_tokens: u32,
) -> Result<Parsed<CapabilityMatch>> {
    let requirements_json = pretty_json(requirements)?;
    let capabilities = catalog::render_for_matching();
    let request = CompletionRequest::new(
        MATCH_SYSTEM,
        match_user(&requirements_json, &capabilities),
        max_tokens,
    );

    let parsed = executor::execute::<CapabilityMatch>(provider, &request).await?;
    if let Some(matched) = parsed.valid() {
        info!(
            capabilities = matched.primary_capabilities.len(),
            gaps = matched.coverage_gaps.len(),
            "capabilities matched"
        );
    }
    Ok(parsed)
}
