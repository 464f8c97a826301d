//! Market context for the BD brief, built from aggregate spend. No model call.

use bidcraft_feeds::SpendingByCategory;

/// Returned when there is no spend data to describe.
pub const NO_MARKET_DATA: &str = "No aggregate spending data available.";

/// Used by callers when the spend query itself failed.
pub const MARKET_DATA_UNAVAILABLE: &str = "Market data unavailable.";

/// Sub-agencies listed in the context block.
const TOP_AGENCIES: usize = 10;

/// Render the top sub-agencies by spend as prompt-ready lines.
pub fn build_market_context(spending: &SpendingByCategory) -> String {
    if spending.results.is_empty() {
        return NO_MARKET_DATA.to_string();
    }

    let mut lines = vec!["Top DoD sub-agencies by contract spend (selected NAICS):".to_string()];
    for entry in spending.results.iter().take(TOP_AGENCIES) {
        let name = entry.name.as_deref().unwrap_or("Unknown");
        let amount = entry.aggregated_amount.unwrap_or(0.0);
        lines.push(format!("  - {name}: ${}", whole_dollars(amount)));
    }
    lines.join("\n")
}

/// Round to whole dollars and group thousands with commas.
fn whole_dollars(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
