//! Prompt text for every model step.
//!
//! System prompts are constants. User prompts are rendered per call from
//! the caller's data and never cached.

/// Company profile shared by the BD-research prompts.
pub const COMPANY_CONTEXT: &str = "
NOU Systems is a small defense contractor headquartered in Huntsville, AL.
Core competencies:
- Systems Engineering & MBSE (SysML, DOORS NG, Cameo)
- Modeling & Simulation (LVC, HLA/DIS, AFSIM, physics-based)
- Cybersecurity & RMF (NIST, DISA STIG, ATO support, Zero Trust)
- Digital Engineering (digital twins, digital thread, MOSA)
- Test & Evaluation (TEMP, DT&E/OT&E support, data analysis)

Typical contracts: $1M-$50M, 3-5 year PoP, prime or major sub
Target agencies: Army (RDECOM/AFC/PEO), Air Force (AFLCMC, AFRL), MDA, DARPA
Strong Huntsville presence; can support Redstone Arsenal programs
Small business, eligible for SBA, 8(a), WOSB set-asides
";

// ---------------------------------------------------------------------------
// Proposal: extract
// ---------------------------------------------------------------------------

pub const EXTRACT_SYSTEM: &str = "You are a proposal analyst specializing in U.S. government defense contracts.
Your job is to read RFP documents and extract structured information.
Always respond with valid JSON only. No markdown fences, no explanation.";

pub fn extract_user(rfp_text: &str) -> String {
    format!(
        r#"Extract the key information from this RFP text and return a JSON object with exactly these fields:

{{
  "program_name": "string or null",
  "agency": "string or null",
  "solicitation_number": "string or null",
  "naics_codes": ["list of NAICS codes found, or empty list"],
  "technical_requirements": ["list of distinct technical requirements"],
  "evaluation_criteria": ["list of evaluation factors/criteria"],
  "deliverables": ["list of required deliverables"],
  "period_of_performance": "string describing PoP, or null",
  "set_aside": "small business set-aside type or null",
  "key_themes": ["3-7 dominant themes or focus areas in the RFP"]
}}

RFP TEXT:
{rfp_text}"#
    )
}

// ---------------------------------------------------------------------------
// Proposal: match
// ---------------------------------------------------------------------------

pub const MATCH_SYSTEM: &str = "You are a business development expert for NOU Systems, a defense contractor
based in Huntsville, AL. Your role is to identify which company capabilities best respond
to an RFP and how to position them. Always respond with valid JSON only.";

pub fn match_user(requirements_json: &str, capabilities: &str) -> String {
    format!(
        r#"Given the RFP requirements below and our company capabilities, identify the
best capability matches and any coverage gaps.

Return a JSON object with this structure:
{{
  "primary_capabilities": [
    {{
      "capability_name": "string",
      "relevance_score": 1-10,
      "why_relevant": "one sentence",
      "key_differentiators": ["list of 2-3 specific things we can say"]
    }}
  ],
  "coverage_gaps": ["any requirements we do not directly address"],
  "win_themes": ["2-4 high-level win themes to thread through the proposal"],
  "recommended_teaming": "brief note on subcontractor/partner gaps, if any"
}}

RFP REQUIREMENTS:
{requirements_json}

OUR CAPABILITIES:
{capabilities}"#
    )
}

// ---------------------------------------------------------------------------
// Proposal: draft (streamed)
// ---------------------------------------------------------------------------

pub const DRAFT_SYSTEM: &str = "You are a senior proposal writer for NOU Systems, a defense contractor
in Huntsville, AL. You write compelling, technically precise, and compliant proposal sections
for U.S. government contracts. Your writing is specific, active-voice, and avoids boilerplate.
Reference the company's actual capabilities and tailor every section to the specific RFP.";

pub fn draft_user(program_name: &str, agency: &str, requirements_json: &str, matched_json: &str) -> String {
    format!(
        r#"Write a full proposal response for the following opportunity. Use the
requirements and matched capabilities to tailor every section specifically to this RFP.

---
PROGRAM: {program_name}
AGENCY: {agency}
---

RFP REQUIREMENTS SUMMARY:
{requirements_json}

MATCHED CAPABILITIES & WIN THEMES:
{matched_json}

---

Write the following proposal sections in order. Use Markdown with clear section headers (##).
Be specific: reference actual capability names, methodologies, and tools. Avoid generic filler.

## Executive Summary
(3-4 paragraphs: what we're offering, why we win, key differentiators)

## Technical Approach
(Detailed response to technical requirements, organized by requirement area. Include specific
methodologies, tools, and how we address each key requirement.)

## Management Approach
(Program management structure, staffing plan, team org chart narrative, risk management,
communication cadence, and transition-in plan)

## Quality Assurance
(QA/QC methodology, process controls, metrics and reporting, deliverable review process,
compliance with government QA requirements; reference ISO 9001 or CMMI if applicable)

## Relevant Experience & Past Performance
(2-3 relevant program examples. Use [PLACEHOLDER] for actual contract numbers, but describe
the type of work, scope, and measurable outcomes realistically)

## Why NOU Systems
(1-2 paragraphs: our unique value proposition for this specific opportunity: small business
agility, deep Huntsville/Redstone Arsenal presence, relevant certifications, and commitment
to mission success)

## Footer
(One-line document control: Company: NOU Systems | Program: {program_name} |
Solicitation: [SOLICITATION NUMBER] | Prepared: [DATE] |
PROPRIETARY, For Government Use Only)
"#
    )
}

// ---------------------------------------------------------------------------
// BD research: score
// ---------------------------------------------------------------------------

pub const SCORE_SYSTEM: &str = "You are a BD analyst for a defense contractor. Your job is to
evaluate contract opportunities and awards for strategic fit. Be concise and realistic.
Respond with valid JSON only. No markdown fences.";

/// Marker line that precedes the record payload in the scoring prompt.
pub const SCORE_DATA_HEADER: &str = "OPPORTUNITIES/AWARDS DATA:";

pub fn score_user(data_json: &str) -> String {
    format!(
        r#"Evaluate these contract opportunities/awards for NOU Systems.

COMPANY PROFILE:
{COMPANY_CONTEXT}

{SCORE_DATA_HEADER}
{data_json}

For each item, return a JSON array where each element has:
{{
  "id": "the award_id or notice_id or sol_number",
  "title": "short title (max 60 chars)",
  "pursuit_score": 1-10,
  "priority": "High" | "Medium" | "Low" | "Monitor",
  "rationale": "1-2 sentences on fit",
  "key_factors": ["2-3 bullet factors"],
  "estimated_value_m": estimated value in $M as a number or null,
  "deadline": "response deadline or end date, or null",
  "agency_short": "short agency name",
  "naics": "NAICS code",
  "set_aside": "set-aside type or 'Full & Open'",
  "flags": ["list of notable flags: e.g. 'Recompete', 'Incumbent Risk', 'Expiring Soon', 'AL location', 'Small Biz Only']"
}}

Return ONLY the JSON array, nothing else."#
    )
}

// ---------------------------------------------------------------------------
// BD research: brief (streamed)
// ---------------------------------------------------------------------------

pub const BRIEF_SYSTEM: &str = "You are a senior BD strategist for a defense contractor in Huntsville, AL.
Write sharp, actionable intelligence briefs. Be specific. Avoid filler.";

pub fn brief_user(focus_areas: &str, scored_json: &str, market_context: &str) -> String {
    format!(
        r#"Write a BD Intelligence Brief for NOU Systems based on this market data.

COMPANY PROFILE:
{COMPANY_CONTEXT}

FOCUS AREAS: {focus_areas}

SCORED OPPORTUNITIES (top results):
{scored_json}

MARKET CONTEXT (USASpending award totals by sub-agency):
{market_context}

---
Write the following sections in Markdown:

## Executive Summary
(2-3 sentences: what the data shows, top takeaway)

## Top Pursuit Opportunities
(For each High/Medium priority item: 1 paragraph with the opportunity name bolded,
why it fits NOU, key risks, recommended next action)

## Market Landscape
(What the award data tells us about spending trends, dominant primes/incumbents,
and where NOU can win)

## Recommended BD Actions
(Numbered list of 5-7 specific, actionable steps NOU should take in the next 30-60 days)

## Watch List
(Brief notes on Monitor-priority items worth tracking)
"#
    )
}
