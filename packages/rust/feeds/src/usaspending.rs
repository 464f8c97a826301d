//! USASpending.gov API client. No API key required.

use chrono::Local;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use bidcraft_shared::{FeedsConfig, RawRecord, Result};

use crate::{build_client, json_body, send_error, window_start};

const SERVICE: &str = "USASpending.gov";

/// Awarding toptier agency every query is restricted to.
const AWARDING_AGENCY: &str = "Department of Defense";

/// Contract award type codes (definitive contracts, purchase orders, delivery orders, BPA calls).
const CONTRACT_AWARD_TYPES: [&str; 4] = ["A", "B", "C", "D"];

const AWARD_FIELDS: [&str; 12] = [
    "Award ID",
    "Recipient Name",
    "Description",
    "Award Amount",
    "Start Date",
    "End Date",
    "Awarding Agency",
    "Awarding Sub Agency",
    "NAICS Code",
    "NAICS Description",
    "Award Type",
    "Place of Performance State Code",
];

/// Parameters for a recent-awards search.
#[derive(Debug, Clone)]
pub struct AwardQuery {
    pub naics_codes: Vec<String>,
    pub days_back: i64,
    pub limit: u32,
}

/// Aggregate spend for one category (e.g. an awarding sub-agency).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategorySpend {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub aggregated_amount: Option<f64>,
}

/// Response of the spending-by-category endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpendingByCategory {
    #[serde(default)]
    pub results: Vec<CategorySpend>,
}

/// Client for the USASpending.gov search API.
#[derive(Debug, Clone)]
pub struct UsaSpendingClient {
    client: Client,
    base_url: String,
}

impl UsaSpendingClient {
    pub fn new(config: &FeedsConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(SERVICE, config.timeout_secs)?,
            base_url: config.usaspending_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch recent DoD contract awards, largest first. Returns the raw API response.
    #[instrument(skip_all, fields(naics = query.naics_codes.len(), days_back = query.days_back))]
    pub async fn fetch_recent_awards(&self, query: &AwardQuery) -> Result<Value> {
        let end = Local::now().date_naive();
        let start = window_start(end, query.days_back)?;

        let payload = json!({
            "filters": {
                "award_type_codes": CONTRACT_AWARD_TYPES,
                "naics_codes": query.naics_codes,
                "time_period": [{
                    "start_date": start.format("%Y-%m-%d").to_string(),
                    "end_date": end.format("%Y-%m-%d").to_string(),
                }],
                "agencies": [{"type": "awarding", "tier": "toptier", "name": AWARDING_AGENCY}],
            },
            "fields": AWARD_FIELDS,
            "sort": "Award Amount",
            "order": "desc",
            "limit": query.limit,
            "page": 1,
        });

        let body: Value = self.post("search/spending_by_award/", &payload).await?;
        let results = body.get("results").and_then(Value::as_array).map_or(0, Vec::len);
        info!(results, "USASpending award search complete");
        Ok(body)
    }

    /// Aggregate DoD spend by awarding sub-agency for the given NAICS codes.
    #[instrument(skip_all, fields(naics = naics_codes.len(), limit))]
    pub async fn fetch_agency_spending(&self, naics_codes: &[String], limit: u32) -> Result<SpendingByCategory> {
        let payload = json!({
            "filters": {
                "award_type_codes": CONTRACT_AWARD_TYPES,
                "naics_codes": naics_codes,
                "agencies": [{"type": "awarding", "tier": "toptier", "name": AWARDING_AGENCY}],
            },
            "category": "awarding_subagency",
            "subaward": false,
            "page": 1,
            "limit": limit,
            "order": "desc",
            "sort": "aggregated_amount",
        });

        self.post("search/spending_by_category/", &payload).await
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, endpoint: &str, payload: &Value) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| send_error(SERVICE, e))?;
        json_body(SERVICE, response).await
    }
}

/// Flatten USASpending award `results` into records.
pub fn normalize_awards(raw: &Value) -> Vec<RawRecord> {
    let Some(results) = raw.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .map(|r| {
            let field = |key: &str| r.get(key).cloned().unwrap_or(json!(""));
            let record = json!({
                "source": "USASpending.gov",
                "type": "award",
                "award_id": field("Award ID"),
                "recipient": r.get("Recipient Name").cloned().unwrap_or(json!("Unknown")),
                "description": field("Description"),
                "amount": r.get("Award Amount").cloned().unwrap_or(json!(0)),
                "start_date": field("Start Date"),
                "end_date": field("End Date"),
                "agency": field("Awarding Agency"),
                "sub_agency": field("Awarding Sub Agency"),
                "naics_code": field("NAICS Code"),
                "naics_description": field("NAICS Description"),
                "award_type": field("Award Type"),
                "state": field("Place of Performance State Code"),
            });
            match record {
                Value::Object(map) => map,
                _ => RawRecord::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidcraft_shared::BidcraftError;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> UsaSpendingClient {
        let config = FeedsConfig {
            usaspending_base_url: format!("{}/api/v2/", server.uri()),
            ..FeedsConfig::default()
        };
        UsaSpendingClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn awards_search_posts_filters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/search/spending_by_award/"))
            .and(body_partial_json(json!({
                "filters": {"naics_codes": ["541330"]},
                "sort": "Award Amount",
                "limit": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"Award ID": "W9113M", "Award Amount": 2500000.0}]
            })))
            .mount(&server)
            .await;

        let query = AwardQuery {
            naics_codes: vec!["541330".into()],
            days_back: 180,
            limit: 3,
        };
        let raw = client_for(&server).fetch_recent_awards(&query).await.unwrap();
        let records = normalize_awards(&raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["award_id"], "W9113M");
        assert_eq!(records[0]["recipient"], "Unknown");
        assert_eq!(records[0]["type"], "award");
    }

    #[tokio::test]
    async fn agency_spending_decodes_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/search/spending_by_category/"))
            .and(body_partial_json(json!({"category": "awarding_subagency"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "category": "awarding_subagency",
                "results": [
                    {"name": "Department of the Army", "aggregated_amount": 9876543.21, "code": "2100"},
                    {"name": "Department of the Navy", "aggregated_amount": 1234567.0}
                ]
            })))
            .mount(&server)
            .await;

        let spending = client_for(&server)
            .fetch_agency_spending(&["541330".into()], 10)
            .await
            .unwrap();
        assert_eq!(spending.results.len(), 2);
        assert_eq!(spending.results[1].name.as_deref(), Some("Department of the Navy"));
    }

    #[tokio::test]
    async fn server_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let query = AwardQuery {
            naics_codes: vec![],
            days_back: 30,
            limit: 1,
        };
        let err = client_for(&server).fetch_recent_awards(&query).await.unwrap_err();
        assert!(matches!(err, BidcraftError::Transport { status: Some(500), .. }));
    }
}
