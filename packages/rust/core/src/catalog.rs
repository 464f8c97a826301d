//! Static company capability catalog.
//!
//! Read-only reference data. Keywords are prompt context for the matcher,
//! nothing filters on them deterministically.

use std::collections::BTreeSet;

/// Keywords rendered per capability in the matcher prompt.
const RENDERED_KEYWORDS: usize = 10;

/// One capability domain the company sells.
#[derive(Debug, Clone, Copy)]
pub struct Capability {
    pub key: &'static str,
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub summary: &'static str,
    pub highlights: &'static [&'static str],
}

pub const CAPABILITIES: &[Capability] = &[
    Capability {
        key: "systems_engineering",
        name: "Systems Engineering",
        keywords: &[
            "systems engineering",
            "SE",
            "MBSE",
            "requirements management",
            "architecture",
            "systems integration",
            "V&V",
            "verification",
            "validation",
            "interface control",
            "ICD",
            "ConOps",
            "SRR",
            "PDR",
            "CDR",
        ],
        summary: "NOU Systems provides full-lifecycle systems engineering support using \
                  Model-Based Systems Engineering (MBSE) methodologies. We deliver rigorous \
                  requirements management, system architecture development, interface definition, \
                  and verification & validation planning for complex DoD programs.",
        highlights: &[
            "SysML/UML model development using Cameo and DOORS NG",
            "Requirements decomposition from mission-level to component-level",
            "Interface Control Document (ICD) development and management",
            "Systems Integration Laboratory (SIL) design and operation",
            "Technical baseline management through all milestone reviews",
            "Digital Thread integration connecting requirements to test results",
        ],
    },
    Capability {
        key: "modeling_simulation",
        name: "Modeling & Simulation",
        keywords: &[
            "modeling",
            "simulation",
            "M&S",
            "LVC",
            "constructive",
            "HLA",
            "DIS",
            "live virtual constructive",
            "wargaming",
            "training",
            "JTLS",
            "AFSIM",
            "physics-based",
            "agent-based",
            "simulation environment",
        ],
        summary: "NOU Systems designs and develops high-fidelity modeling & simulation \
                  environments for DoD test, training, and analysis. Our M&S capabilities \
                  span physics-based engagement simulations, constructive wargaming environments, \
                  and Live-Virtual-Constructive (LVC) federation architectures.",
        highlights: &[
            "LVC federation design using HLA/DIS standards",
            "Physics-based sensor and RF environment modeling",
            "AFSIM scenario development for air and missile defense analysis",
            "Real-time hardware-in-the-loop (HiL) integration",
            "Simulation environment accreditation support (VV&A)",
            "Distributed simulation infrastructure on AWS GovCloud and on-prem",
        ],
    },
    Capability {
        key: "cybersecurity",
        name: "Cybersecurity & RMF",
        keywords: &[
            "cybersecurity",
            "RMF",
            "risk management framework",
            "NIST",
            "DISA",
            "STIG",
            "ATO",
            "authorization to operate",
            "vulnerability",
            "pen test",
            "zero trust",
            "CMMC",
            "DoD cyber",
            "IA",
            "information assurance",
            "SIEM",
            "threat hunting",
            "DevSecOps",
        ],
        summary: "NOU Systems delivers end-to-end cybersecurity support for DoD programs, \
                  from NIST RMF package development through ATO and continuous monitoring. \
                  Our team holds active clearances and relevant certifications (CISSP, CEH, \
                  Security+) to support classified and unclassified environments.",
        highlights: &[
            "Full RMF lifecycle: Categorize, Select, Implement, Assess, Authorize, Monitor",
            "STIG implementation and compliance scanning (ACAS, SCAP)",
            "System Security Plan (SSP) and POAM development",
            "Zero Trust Architecture (ZTA) design per DoD ZT Reference Architecture",
            "Penetration testing and red team exercises on classified networks",
            "DevSecOps pipeline integration with automated security scanning",
        ],
    },
    Capability {
        key: "digital_engineering",
        name: "Digital Engineering",
        keywords: &[
            "digital engineering",
            "DE",
            "digital twin",
            "digital thread",
            "model-based",
            "authoritative source of truth",
            "MOSA",
            "open architecture",
            "data management",
            "PLM",
            "digital transformation",
        ],
        summary: "NOU Systems supports DoD digital engineering transformation initiatives \
                  by establishing authoritative sources of truth, implementing digital thread \
                  strategies, and creating digital twins for complex weapon systems.",
        highlights: &[
            "Digital Engineering Strategy development per OSD DE Strategy",
            "Authoritative Source of Truth (ASoT) framework implementation",
            "Digital Twin development for predictive maintenance and readiness",
            "Model-Based Definition (MBD) and 3D annotated technical data packages",
            "Modular Open Systems Approach (MOSA) architecture design",
            "Tool integration across DOORS, Cameo, JIRA, Confluence, and CI/CD pipelines",
        ],
    },
    Capability {
        key: "test_evaluation",
        name: "Test & Evaluation",
        keywords: &[
            "test and evaluation",
            "T&E",
            "DT&E",
            "OT&E",
            "TEMP",
            "test planning",
            "developmental test",
            "operational test",
            "ATEC",
            "AFOTEC",
            "NAVAIR",
            "live fire",
            "range",
            "instrumentation",
            "data analysis",
        ],
        summary: "NOU Systems provides comprehensive Test & Evaluation support from TEMP \
                  development through execution and post-test data analysis. We support \
                  DT&E and OT&E across Army, Navy, and Air Force test ranges.",
        highlights: &[
            "Test & Evaluation Master Plan (TEMP) development",
            "Test procedure design and safety review documentation",
            "Range instrumentation and telemetry data collection",
            "Post-test data reduction and statistical analysis",
            "Independent Evaluation support for MDAPs",
            "Automated test reporting dashboards and traceability matrices",
        ],
    },
];

/// Render the catalog as the flat text block the matcher prompt embeds.
pub fn render_for_matching() -> String {
    let mut lines = Vec::new();
    for cap in CAPABILITIES {
        lines.push(format!("## {}", cap.name));
        lines.push(cap.summary.to_string());
        lines.push("Key offerings:".to_string());
        lines.extend(cap.highlights.iter().map(|h| format!("  - {h}")));
        let keywords: Vec<&str> = cap.keywords.iter().take(RENDERED_KEYWORDS).copied().collect();
        lines.push(format!("Relevant keywords: {}", keywords.join(", ")));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Every keyword across the catalog, sorted and deduplicated.
pub fn all_keywords() -> Vec<&'static str> {
    CAPABILITIES
        .iter()
        .flat_map(|c| c.keywords.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_every_capability() {
        let text = render_for_matching();
        for cap in CAPABILITIES {
            assert!(text.contains(&format!("## {}\n{}", cap.name, cap.summary)));
        }
        assert!(text.contains("Key offerings:\n  - SysML/UML model development using Cameo and DOORS NG"));
    }

    #[test]
    fn render_caps_keywords_at_ten() {
        let text = render_for_matching();
        assert!(text.contains(
            "Relevant keywords: systems engineering, SE, MBSE, requirements management, architecture, \
             systems integration, V&V, verification, validation, interface control\n"
        ));
        assert!(!text.contains("ConOps"));
    }

    #[test]
    fn render_is_stable_across_calls() {
        assert_eq!(render_for_matching(), render_for_matching());
    }

    #[test]
    fn keywords_are_unique() {
        let keywords = all_keywords();
        let total: usize = CAPABILITIES.iter().map(|c| c.keywords.len()).sum();
        assert!(keywords.len() <= total);
        assert!(keywords.windows(2).all(|w| w[0] < w[1]));
        assert!(keywords.contains(&"MBSE"));
    }
}
