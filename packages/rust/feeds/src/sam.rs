//! SAM.gov Opportunities API client.
//!
//! Requires a free API key from <https://sam.gov/profile>. Callers treat
//! this feed as optional: a missing key never reaches this module.

use chrono::Local;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, instrument};

use bidcraft_shared::{FeedsConfig, RawRecord, Result};

use crate::naics::set_aside_label;
use crate::{build_client, json_body, send_error, window_start};

const SERVICE: &str = "SAM.gov";

/// Maximum characters of a notice description kept in a record.
const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Search parameters for active solicitations.
#[derive(Debug, Clone)]
pub struct SamQuery {
    pub naics_codes: Vec<String>,
    pub limit: u32,
    pub set_aside_codes: Option<Vec<String>>,
    pub days_posted: i64,
}

/// Client for the SAM.gov opportunities search endpoint.
#[derive(Debug, Clone)]
pub struct SamClient {
    client: Client,
    search_url: String,
}

impl SamClient {
    pub fn new(config: &FeedsConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(SERVICE, config.timeout_secs)?,
            search_url: config.sam_search_url.clone(),
        })
    }

    /// Fetch active solicitations for the query. Returns the raw API response.
    #[instrument(skip_all, fields(naics = query.naics_codes.len(), limit = query.limit))]
    pub async fn fetch_opportunities(&self, query: &SamQuery, api_key: &str) -> Result<Value> {
        let today = Local::now().date_naive();
        let posted_from = window_start(today, query.days_posted)?
            .format("%m/%d/%Y")
            .to_string();
        let posted_to = today.format("%m/%d/%Y").to_string();

        let mut params: Vec<(&str, String)> = vec![
            ("api_key", api_key.to_string()),
            ("naicsCode", query.naics_codes.join(",")),
            ("active", "true".into()),
            ("limit", query.limit.to_string()),
            ("offset", "0".into()),
            ("postedFrom", posted_from),
            ("postedTo", posted_to),
            ("sort", "-modifiedDate".into()),
        ];
        if let Some(codes) = query.set_aside_codes.as_ref().filter(|c| !c.is_empty()) {
            params.push(("typeOfSetAsideCode", codes.join(",")));
        }

        let response = self
            .client
            .get(&self.search_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| send_error(SERVICE, e))?;

        let body: Value = json_body(SERVICE, response).await?;
        let total = body.get("totalRecords").and_then(Value::as_u64).unwrap_or(0);
        info!(total, "SAM.gov search complete");
        Ok(body)
    }
}

/// Flatten SAM.gov `opportunitiesData` into records.
pub fn normalize_opportunities(raw: &Value) -> Vec<RawRecord> {
    let Some(opps) = raw.get("opportunitiesData").and_then(Value::as_array) else {
        return Vec::new();
    };

    opps.iter()
        .map(|o| {
            let text = |key: &str| o.get(key).and_then(Value::as_str).unwrap_or("").to_string();
            let notice_id = text("noticeId");
            let sub_agency = o
                .get("officeAddress")
                .and_then(|a| a.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("");
            let award_amount = o
                .get("estimatedTotalValue")
                .filter(|v| !v.is_null())
                .or_else(|| o.get("award").and_then(|a| a.get("amount")))
                .cloned()
                .unwrap_or(json!(0));
            let description: String = text("description").chars().take(MAX_DESCRIPTION_CHARS).collect();
            let set_aside = text("typeOfSetAside");
            let set_aside_description = match text("typeOfSetAsideDescription") {
                d if d.is_empty() => set_aside_label(&set_aside).to_string(),
                d => d,
            };

            let record = json!({
                "source": "SAM.gov",
                "type": "solicitation",
                "notice_id": notice_id,
                "title": text("title"),
                "sol_number": text("solicitationNumber"),
                "agency": text("organizationName"),
                "sub_agency": sub_agency,
                "posted_date": text("postedDate"),
                "response_deadline": text("responseDeadLine"),
                "naics_code": text("naicsCode"),
                "set_aside": set_aside,
                "set_aside_description": set_aside_description,
                "award_amount": award_amount,
                "description": description,
                "active": o.get("active").cloned().unwrap_or(json!("")),
                "url": format!("https://sam.gov/opp/{notice_id}/view"),
            });
            match record {
                Value::Object(map) => map,
                _ => RawRecord::new(),
            }
        })
        .collect()
}
