//! Requirement extraction: RFP text to [`StructuredRequirements`].

use tracing::{info, instrument};

use bidcraft_provider::{CompletionRequest, ModelProvider};
use bidcraft_shared::{Parsed, Result, StructuredRequirements};

use crate::executor;
use crate::prompts::{EXTRACT_SYSTEM, extract_user};

/// Extract structured requirements from (already truncated) RFP text.
#[instrument(skip_all, fields(chars = rfp_text.chars().count()))]
pub async fn extract_requirements(
    provider: &dyn ModelProvider,
    rfp_text: &str,
    max_tokens: u32,
) -> Result<Parsed<StructuredRequirements>> {
    let request = CompletionRequest::new(EXTRACT_SYSTEM, extract_user(rfp_text), max_tokens);
    let parsed = executor::execute::<StructuredRequirements>(provider, &request).await?;
    info!(parse_failed = parsed.is_failed(), "requirements extracted");
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::ScriptedProvider;

    #[tokio::test]
    async fn rfp_text_lands_in_the_prompt() {
        let provider = ScriptedProvider::new().with_reply("not json at all");
        let parsed = extract_requirements(&provider, "SOLICITATION W31P4Q-25-R-0042", 4096)
            .await
            .unwrap();
        assert!(parsed.is_failed());

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, EXTRACT_SYSTEM);
        assert_eq!(calls[0].max_tokens, 4096);
        assert!(calls[0].user.ends_with("RFP TEXT:\nSOLICITATION W31P4Q-25-R-0042"));
    }
}
