//! Government contract data feeds: SAM.gov and USASpending.gov.
//!
//! Both clients are thin request/response wrappers. They return the
//! provider's raw JSON and offer normalizers that project it into the flat
//! [`RawRecord`](bidcraft_shared::RawRecord) shape the scorer consumes.

pub mod naics;
pub mod sam;
pub mod usaspending;

use std::time::Duration;

use chrono::{NaiveDate, TimeDelta};
use reqwest::{Client, Response};

use bidcraft_shared::{BidcraftError, Result};

pub use naics::{NAICS_PROFILES, NaicsProfile, all_codes, codes_for};
pub use sam::{SamClient, SamQuery, normalize_opportunities};
pub use usaspending::{AwardQuery, CategorySpend, SpendingByCategory, UsaSpendingClient, normalize_awards};

/// User-Agent string for feed requests.
const USER_AGENT: &str = concat!("Bidcraft/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with a hard per-request ceiling.
fn build_client(service: &str, timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| BidcraftError::transport(service, None, format!("failed to build HTTP client: {e}")))
}

/// Map a send failure onto a transport error for `service`.
fn send_error(service: &str, err: reqwest::Error) -> BidcraftError {
    let status = err.status().map(|s| s.as_u16());
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    };
    BidcraftError::transport(service, status, message)
}

/// First day of a window reaching `days` back from `end`.
fn window_start(end: NaiveDate, days: i64) -> Result<NaiveDate> {
    TimeDelta::try_days(days)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| BidcraftError::input(format!("date window of {days} days is out of range")))
}

/// Reject non-2xx responses and decode the JSON body.
async fn json_body<T: serde::de::DeserializeOwned>(service: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(BidcraftError::transport(
            service,
            Some(status.as_u16()),
            format!("HTTP {status}"),
        ));
    }

    response
        .json()
        .await
        .map_err(|e| BidcraftError::transport(service, Some(status.as_u16()), format!("invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_start_counts_back_from_end() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(window_start(end, 1).unwrap(), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn window_start_rejects_overflowing_spans() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        for days in [100_000_000, -100_000_000, i64::MAX] {
            assert!(matches!(window_start(end, days), Err(BidcraftError::Input { .. })));
        }
    }
}
