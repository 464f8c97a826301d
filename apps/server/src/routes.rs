//! HTTP routes for both deployments.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use bidcraft_core::catalog::{self, CAPABILITIES};
use bidcraft_core::{
    AnalyzeOutcome, BriefParams, ProposalPipeline, ResearchOutcome, ResearchParams, ResearchPipeline,
};
use bidcraft_feeds::NAICS_PROFILES;
use bidcraft_shared::{CapabilityMatch, StructuredRequirements};

use crate::error::ApiError;
use crate::sse::sse_response;

/// Upload ceiling for `/api/analyze`.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Routes of the proposal deployment.
pub(crate) fn proposal_router(pipeline: Arc<ProposalPipeline>) -> Router {
    Router::new()
        .route("/health", get(|| health("proposal")))
        .route("/api/analyze", post(analyze))
        .route("/api/draft", post(draft))
        .route("/api/capabilities", get(capabilities))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(pipeline)
}

/// Routes of the BD-research deployment.
pub(crate) fn research_router(pipeline: Arc<ResearchPipeline>) -> Router {
    Router::new()
        .route("/health", get(|| health("research")))
        .route("/api/naics-profiles", get(naics_profiles))
        .route("/api/research", post(research))
        .route("/api/brief", post(brief))
        .with_state(pipeline)
}

async fn health(domain: &'static str) -> Json<Value> {
    Json(json!({ "status": "ok", "domain": domain }))
}

/// Unwrap a JSON body, reporting any rejection as 422.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::unprocessable(rejection.body_text()))
}

// ---------------------------------------------------------------------------
// Proposal
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
async fn analyze(
    State(pipeline): State<Arc<ProposalPipeline>>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeOutcome>, ApiError> {
    let mut pasted: Option<String> = None;
    let mut uploaded: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::unprocessable(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("rfp_text") => {
                let text = field.text().await.map_err(|e| ApiError::unprocessable(e.body_text()))?;
                pasted = Some(text);
            }
            Some("rfp_file") => {
                let Some(file_name) = field.file_name().map(str::to_owned).filter(|n| !n.is_empty()) else {
                    continue;
                };
                if file_name.to_ascii_lowercase().ends_with(".pdf") {
                    return Err(ApiError::unprocessable(
                        "PDF uploads are not supported. Paste the RFP text or upload a plain-text file.",
                    ));
                }
                let bytes = field.bytes().await.map_err(|e| ApiError::unprocessable(e.body_text()))?;
                info!(file = %file_name, bytes = bytes.len(), "RFP file received");
                uploaded = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            _ => {}
        }
    }

    let raw_text = uploaded
        .or_else(|| pasted.filter(|t| !t.trim().is_empty()))
        .ok_or_else(|| ApiError::unprocessable("Provide either rfp_text or rfp_file."))?;

    Ok(Json(pipeline.analyze(&raw_text).await?))
}

#[derive(Deserialize)]
struct DraftBody {
    #[serde(default)]
    requirements: Value,
    #[serde(default)]
    matched: Value,
}

/// A non-empty JSON object that is not a parse-failure marker.
fn usable_object(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| !map.is_empty() && !map.contains_key("parse_error"))
}

async fn draft(
    State(pipeline): State<Arc<ProposalPipeline>>,
    payload: Result<Json<DraftBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = json_body(payload)?;
    if !usable_object(&body.requirements) || !usable_object(&body.matched) {
        return Err(ApiError::unprocessable(
            "Body must include 'requirements' and 'matched' keys.",
        ));
    }

    let requirements: StructuredRequirements = serde_json::from_value(body.requirements)
        .map_err(|e| ApiError::unprocessable(format!("invalid requirements: {e}")))?;
    let matched: CapabilityMatch = serde_json::from_value(body.matched)
        .map_err(|e| ApiError::unprocessable(format!("invalid matched: {e}")))?;

    Ok(sse_response(pipeline.draft(&requirements, &matched)?))
}

async fn capabilities() -> Json<Value> {
    let entries: Vec<Value> = CAPABILITIES
        .iter()
        .map(|c| json!({ "key": c.key, "name": c.name, "summary": c.summary, "highlights": c.highlights }))
        .collect();
    Json(json!({ "capabilities": entries, "keywords": catalog::all_keywords() }))
}

// ---------------------------------------------------------------------------
// BD research
// ---------------------------------------------------------------------------

async fn naics_profiles() -> Json<Map<String, Value>> {
    let profiles = NAICS_PROFILES
        .iter()
        .map(|p| {
            let entry = json!({ "label": p.label, "codes": p.codes, "description": p.description });
            (p.key.to_string(), entry)
        })
        .collect();
    Json(profiles)
}

async fn research(
    State(pipeline): State<Arc<ResearchPipeline>>,
    payload: Result<Json<ResearchParams>, JsonRejection>,
) -> Result<Json<ResearchOutcome>, ApiError> {
    let params = json_body(payload)?;
    Ok(Json(pipeline.research(&params).await?))
}

async fn brief(
    State(pipeline): State<Arc<ResearchPipeline>>,
    payload: Result<Json<BriefParams>, JsonRejection>,
) -> Result<Response, ApiError> {
    let params = json_body(payload)?;
    Ok(sse_response(pipeline.brief(&params).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use bidcraft_core::fake::ScriptedProvider;
    use bidcraft_provider::StreamItem;
    use bidcraft_shared::{BidcraftError, FeedsConfig, MaxTokensConfig};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BOUNDARY: &str = "bidcraft-test-boundary";

    const REQUIREMENTS: &str = r#"{"program_name": "Range Ops", "agency": "Army",
        "solicitation_number": null, "naics_codes": [], "technical_requirements": [],
        "evaluation_criteria": [], "deliverables": [], "period_of_performance": null,
        "set_aside": null, "key_themes": []}"#;

    fn proposal_app(provider: Arc<ScriptedProvider>) -> Router {
        proposal_router(Arc::new(ProposalPipeline::new(provider, MaxTokensConfig::default())))
    }

    fn research_app(provider: Arc<ScriptedProvider>, server: &MockServer) -> Router {
        let feeds = FeedsConfig {
            sam_search_url: format!("{}/opportunities/v2/search", server.uri()),
            usaspending_base_url: format!("{}/api/v2", server.uri()),
            ..FeedsConfig::default()
        };
        let pipeline = ResearchPipeline::new(provider, &feeds, None, MaxTokensConfig::default()).unwrap();
        research_router(Arc::new(pipeline))
    }

    /// Build a multipart body from `(name, file_name, content)` parts.
    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(file) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::post("/api/analyze")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_domain() {
        let app = proposal_app(Arc::new(ScriptedProvider::new()));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok", "domain": "proposal"}));
    }

    #[tokio::test]
    async fn capabilities_lists_catalog_and_keywords() {
        let app = proposal_app(Arc::new(ScriptedProvider::new()));
        let response = app
            .oneshot(Request::get("/api/capabilities").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["capabilities"].as_array().unwrap().len(), 5);
        assert_eq!(json["capabilities"][0]["name"], "Systems Engineering");
        let keywords = json["keywords"].as_array().unwrap();
        assert!(keywords.contains(&json!("MBSE")));
        assert!(keywords.windows(2).all(|w| w[0].as_str() < w[1].as_str()));
    }

    #[tokio::test]
    async fn analyze_without_input_is_rejected_before_model_call() {
        let provider = Arc::new(ScriptedProvider::new());
        let app = proposal_app(provider.clone());

        let response = app.oneshot(multipart(&[("rfp_text", None, "   ")])).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["detail"], "Provide either rfp_text or rfp_file.");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn analyze_rejects_pdf_uploads() {
        let provider = Arc::new(ScriptedProvider::new());
        let app = proposal_app(provider.clone());

        let response = app
            .oneshot(multipart(&[("rfp_file", Some("solicitation.PDF"), "%PDF-1.7")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn analyze_prefers_uploaded_file() {
        let provider = Arc::new(ScriptedProvider::new().with_reply("not json"));
        let app = proposal_app(provider.clone());

        let response = app
            .oneshot(multipart(&[
                ("rfp_text", None, "pasted text"),
                ("rfp_file", Some("rfp.txt"), "uploaded text"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["requirements"], json!({"parse_error": "not json"}));
        assert_eq!(json["matched"], Value::Null);
        assert_eq!(json["truncated"], false);
        assert_eq!(json["char_count"], 13);
        assert!(provider.calls()[0].user.ends_with("uploaded text"));
    }

    #[tokio::test]
    async fn analyze_provider_failure_is_bad_gateway() {
        let provider = Arc::new(ScriptedProvider::new().with_error("HTTP 529: overloaded"));
        let app = proposal_app(provider);

        let response = app.oneshot(multipart(&[("rfp_text", None, "RFP")])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn draft_requires_both_objects() {
        let provider = Arc::new(ScriptedProvider::new());
        let app = proposal_app(provider.clone());

        let body = json!({"requirements": serde_json::from_str::<Value>(REQUIREMENTS).unwrap()});
        let response = app.oneshot(json_request("/api/draft", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await["detail"],
            "Body must include 'requirements' and 'matched' keys."
        );
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn draft_rejects_parse_failure_marker() {
        let app = proposal_app(Arc::new(ScriptedProvider::new()));
        let body = json!({
            "requirements": {"parse_error": "garbage"},
            "matched": {"win_themes": []}
        });
        let response = app.oneshot(json_request("/api/draft", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn draft_streams_sse_frames() {
        let provider = Arc::new(ScriptedProvider::new().with_stream(vec![
            Ok(StreamItem::Text("## Executive Summary\n".into())),
            Ok(StreamItem::Text("We win.".into())),
            Ok(StreamItem::Stop {
                stop_reason: Some("end_turn".into()),
            }),
        ]));
        let app = proposal_app(provider);

        let body = json!({
            "requirements": serde_json::from_str::<Value>(REQUIREMENTS).unwrap(),
            "matched": {"primary_capabilities": [], "coverage_gaps": [], "win_themes": ["Speed"], "recommended_teaming": null}
        });
        let response = app.oneshot(json_request("/api/draft", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()["x-accel-buffering"], "no");

        assert_eq!(
            body_text(response).await,
            "data: {\"text\":\"## Executive Summary\\n\"}\n\n\
             data: {\"text\":\"We win.\"}\n\n\
             data: [DONE]\n\n"
        );
    }

    #[tokio::test]
    async fn draft_mid_stream_error_is_framed() {
        let provider = Arc::new(ScriptedProvider::new().with_stream(vec![
            Ok(StreamItem::Text("Partial".into())),
            Err(BidcraftError::provider("stream aborted")),
        ]));
        let app = proposal_app(provider);

        let body = json!({
            "requirements": serde_json::from_str::<Value>(REQUIREMENTS).unwrap(),
            "matched": {"win_themes": ["Speed"]}
        });
        let response = app.oneshot(json_request("/api/draft", body)).await.unwrap();
        let text = body_text(response).await;

        let frames: Vec<&str> = text.split("\n\n").filter(|f| !f.is_empty()).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], "data: {\"text\":\"Partial\"}");
        assert!(frames[1].starts_with("data: {\"error\":"));
        assert_eq!(frames[2], "data: [DONE]");
    }

    #[tokio::test]
    async fn naics_profiles_keyed_by_focus_area() {
        let server = MockServer::start().await;
        let app = research_app(Arc::new(ScriptedProvider::new()), &server);

        let response = app
            .oneshot(Request::get("/api/naics-profiles").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_object().unwrap().len(), 5);
        assert_eq!(json["cybersecurity"]["codes"], json!(["541512", "541513", "541519"]));
        assert_eq!(json["test_evaluation"]["label"], "Test & Evaluation");
    }

    #[tokio::test]
    async fn research_returns_scored_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/search/spending_by_award/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"Award ID": "A1"}]})))
            .mount(&server)
            .await;

        let reply = json!([{"id": "A1", "pursuit_score": 7, "priority": "Medium"}]).to_string();
        let app = research_app(Arc::new(ScriptedProvider::new().with_reply(reply)), &server);

        let response = app
            .oneshot(json_request("/api/research", json!({"focus_areas": ["cybersecurity"], "limit": 5})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["raw_count"], 1);
        assert_eq!(json["sam_status"], "not_configured");
        assert_eq!(json["naics_codes"], json!(["541512", "541513", "541519"]));
        assert_eq!(json["scored"][0]["id"], "A1");
        assert_eq!(json["errors"], json!([]));
    }

    #[tokio::test]
    async fn research_with_no_data_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let app = research_app(Arc::new(ScriptedProvider::new()), &server);
        let response = app.oneshot(json_request("/api/research", json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("USASpending.gov error:"));
    }

    #[tokio::test]
    async fn research_rejects_malformed_body() {
        let server = MockServer::start().await;
        let app = research_app(Arc::new(ScriptedProvider::new()), &server);
        let response = app
            .oneshot(json_request("/api/research", json!({"days_back": "forever"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn brief_streams_with_market_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = Arc::new(ScriptedProvider::new().with_stream(vec![
            Ok(StreamItem::Text("## Executive Summary".into())),
            Ok(StreamItem::Stop { stop_reason: None }),
        ]));
        let app = research_app(provider.clone(), &server);

        let body = json!({"scored": [{"id": "A1", "priority": "High"}], "focus_areas": ["cybersecurity"]});
        let response = app.oneshot(json_request("/api/brief", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.ends_with("data: [DONE]\n\n"));

        let user = &provider.calls()[0].user;
        assert!(user.contains("Market data unavailable."));
        assert!(user.contains("FOCUS AREAS: cybersecurity\n"));
    }
}
