//! NAICS focus-area profiles and set-aside labels.

use std::collections::BTreeSet;

use serde::Serialize;

/// A focus area and the NAICS codes that represent it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NaicsProfile {
    pub key: &'static str,
    pub label: &'static str,
    pub codes: &'static [&'static str],
    pub description: &'static str,
}

pub const NAICS_PROFILES: &[NaicsProfile] = &[
    NaicsProfile {
        key: "systems_engineering",
        label: "Systems Engineering",
        codes: &["541330", "541990", "541611"],
        description: "Engineering services, technical consulting, management consulting",
    },
    NaicsProfile {
        key: "modeling_simulation",
        label: "Modeling & Simulation",
        codes: &["541512", "541519", "541715"],
        description: "Computer systems design, R&D in engineering sciences",
    },
    NaicsProfile {
        key: "cybersecurity",
        label: "Cybersecurity",
        codes: &["541512", "541513", "541519"],
        description: "Computer systems design, network/data security services",
    },
    NaicsProfile {
        key: "digital_engineering",
        label: "Digital Engineering",
        codes: &["541512", "541330", "541715"],
        description: "MBSE, digital twin, model-based definition",
    },
    NaicsProfile {
        key: "test_evaluation",
        label: "Test & Evaluation",
        codes: &["541380", "541990", "334511"],
        description: "Testing laboratories, navigation/guidance instruments",
    },
];

/// SAM.gov set-aside codes and their display labels.
pub const SET_ASIDE_LABELS: &[(&str, &str)] = &[
    ("SBA", "Small Business"),
    ("8A", "8(a) Set-Aside"),
    ("HZC", "HUBZone"),
    ("HZS", "HUBZone Sole Source"),
    ("SBP", "Small Business Set-Aside (Partial)"),
    ("WNN", "Women-Owned Small Business"),
    ("WOSB", "WOSB Set-Aside"),
    ("ESB", "Emerging Small Business"),
    ("VSB", "Very Small Business"),
    ("NONE", "Full & Open"),
];

/// Look up a profile by its key.
pub fn profile(key: &str) -> Option<&'static NaicsProfile> {
    NAICS_PROFILES.iter().find(|p| p.key == key)
}

/// Keys of every profile, in declaration order.
pub fn all_focus_areas() -> Vec<String> {
    NAICS_PROFILES.iter().map(|p| p.key.to_string()).collect()
}

/// Every NAICS code across all profiles, sorted and deduplicated.
pub fn all_codes() -> Vec<String> {
    NAICS_PROFILES
        .iter()
        .flat_map(|p| p.codes.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

/// NAICS codes for the selected focus areas; unknown keys are ignored.
///
/// Falls back to [`all_codes`] when nothing matches.
pub fn codes_for(focus_areas: &[String]) -> Vec<String> {
    let selected: BTreeSet<&str> = focus_areas
        .iter()
        .filter_map(|area| profile(area))
        .flat_map(|p| p.codes.iter().copied())
        .collect();

    if selected.is_empty() {
        return all_codes();
    }
    selected.into_iter().map(String::from).collect()
}

/// Display label for a SAM.gov set-aside code. Empty means full and open.
pub fn set_aside_label(code: &str) -> &'static str {
    if code.is_empty() {
        return "Full & Open";
    }
    SET_ASIDE_LABELS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, label)| *label)
        .unwrap_or("Other")
}
