// src/analysis/prompt.rs
use crate::extractors::SectionId;
use crate::pipeline::{FilingRecord, FilingSections};

/// Characters of each section sent for a single-filing analysis.
pub const SECTION_CHAR_BUDGET: usize = 20_000;
/// Floor for the per-filing share of the budget in longitudinal mode.
pub const MIN_LONGITUDINAL_CHARS: usize = 2_000;

const RATING_GUIDE: &str = r#"Rate each of the FOUR categories below.
Scale for categories 1-3: [Excellent / Strong / Adequate / Weak / Poor]
Scale for category 4: [Minimal / Manageable / Moderate / High / Existential]

### RATING DEFINITIONS

1. Durable Competitive Advantages (Moat)
- Excellent: Wide moat. Irreplaceable brand, dominant network effects or structural cost advantages. High switching costs.
- Strong: Clear competitive advantages with meaningful barriers to entry.
- Adequate: Some advantages, but persistent competitive pressure.
- Weak: Limited differentiation. Competes largely on price or execution.
- Poor: No durable advantage. Losing share or structurally disadvantaged.

2. Reinvestment Opportunities
- Excellent: Large, expanding market with sustained high-return reinvestment potential.
- Strong: Clear growth runway with attractive incremental returns.
- Adequate: Growth in line with the industry; few high-return projects.
- Weak: Few scalable reinvestment opportunities.
- Poor: Stagnant industry or value-destroying reinvestment.

3. Management Capability
- Excellent: Exceptional long-term capital allocators, strongly aligned with shareholders.
- Strong: Strategic clarity and disciplined allocation.
- Adequate: Competent operators without evidence of superior allocation.
- Weak: Inconsistent strategy or questionable capital decisions.
- Poor: Value-destroying allocation or misaligned incentives.

4. Risk Profile
- Minimal: Highly stable model with few operational or financial vulnerabilities.
- Manageable: Typical industry risks, acknowledged and mitigated.
- Moderate: Significant risks that could impair results if triggered.
- High: Severe strategic, regulatory, technological or financial exposure.
- Existential: Realistic risk of insolvency, disruption or permanent impairment."#;

const SCENARIO_GUIDE: &str = r#"5. THESIS-BREAKING SCENARIOS

Identify THREE specific scenarios that could materially impair or permanently damage the business.
For each scenario describe the triggering condition, the mechanism of damage, whether management
appears aware and prepared, and classify severity as [Serious / Severe / Existential].
Favour structural risks such as technological disruption, regulatory change, customer concentration,
platform dependency, capital allocation failure, margin compression or balance sheet fragility.
Avoid generic statements and tie every scenario to the filing text."#;

const SINGLE_OUTPUT_FORMAT: &str = r#"OUTPUT FORMAT:

1. Durable Competitive Advantages: [RATING]
Justification: ...

2. Reinvestment Opportunities: [RATING]
Justification: ...

3. Management Capability: [RATING]
Justification: ...

4. Risk Profile: [RATING]
Justification: ...

5. Thesis-Breaking Scenarios:
Scenario 1:
Trigger:
Mechanism:
Management Preparedness:
Severity:

Scenario 2:
...

Scenario 3:
..."#;

/// Returns at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn section_block(out: &mut String, heading: &str, body: &str, budget: usize) {
    out.push_str(heading);
    out.push_str(" (PARTIAL):\n");
    if body.is_empty() {
        out.push_str("[Section not found in this filing]\n\n");
    } else {
        out.push_str(truncate_chars(body, budget));
        out.push_str("\n\n");
    }
}

/// Prompt for a qualitative assessment of one filing.
pub fn build_single_prompt(ticker: &str, filing: &FilingSections) -> String {
    let mut prompt = format!(
        "Analyze the following sections from the {} 10-K filing (filed {}) of {} ({}).\n\n",
        filing.filing.fiscal_year(),
        filing.filing.filing_date,
        filing.filing.company_name,
        ticker
    );
    prompt.push_str(RATING_GUIDE);
    prompt.push_str("\n\nThen identify THREE concrete business-breaking scenarios based strictly on the filing.\n\n---\n\n");
    prompt.push_str(SCENARIO_GUIDE);
    prompt.push_str("\n\n---\n\n");

    section_block(&mut prompt, "BUSINESS SECTION", filing.section(&SectionId::Business), SECTION_CHAR_BUDGET);
    section_block(
        &mut prompt,
        "MANAGEMENT DISCUSSION & ANALYSIS",
        filing.section(&SectionId::ManagementDiscussion),
        SECTION_CHAR_BUDGET,
    );
    section_block(&mut prompt, "RISK FACTORS", filing.section(&SectionId::RiskFactors), SECTION_CHAR_BUDGET);

    prompt.push_str("---\n\n");
    prompt.push_str(SINGLE_OUTPUT_FORMAT);
    prompt
}

/// Prompt comparing the same sections across several filings of one company.
/// The per-section budget is shared between filings so the prompt stays bounded.
pub fn build_longitudinal_prompt(ticker: &str, record: &FilingRecord) -> String {
    let filings = record.filings.len().max(1);
    let budget = (SECTION_CHAR_BUDGET / filings).max(MIN_LONGITUDINAL_CHARS);

    let mut prompt = format!(
        "Analyze how {} ({}) has evolved across its last {} 10-K filings, using the sections below.\n\n",
        record.company_name, ticker, record.filings.len()
    );
    prompt.push_str(RATING_GUIDE);
    prompt.push_str(
        "\n\nRate each category for the MOST RECENT filing, and state for each whether it is \
         [Improving / Stable / Deteriorating] compared with the earlier filings, citing what changed.\n\n---\n\n",
    );
    prompt.push_str(SCENARIO_GUIDE);
    prompt.push_str("\n\n---\n\n");

    for filing in &record.filings {
        prompt.push_str(&format!(
            "===== FILING {} (fiscal year {}) =====\n\n",
            filing.filing.filing_date,
            filing.filing.fiscal_year()
        ));
        section_block(&mut prompt, "BUSINESS SECTION", filing.section(&SectionId::Business), budget);
        section_block(
            &mut prompt,
            "MANAGEMENT DISCUSSION & ANALYSIS",
            filing.section(&SectionId::ManagementDiscussion),
            budget,
        );
        section_block(&mut prompt, "RISK FACTORS", filing.section(&SectionId::RiskFactors), budget);
    }

    prompt.push_str("---\n\nOUTPUT FORMAT:\n\n");
    prompt.push_str("For categories 1-4: [RATING] ([TREND]) followed by a Justification line.\n");
    prompt.push_str("Then a section 'What Changed' listing the most material differences between filings.\n");
    prompt.push_str("Then the three Thesis-Breaking Scenarios (Trigger, Mechanism, Management Preparedness, Severity).");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::FilingInfo;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn sections(date: &str, business: &str, mdna: &str, risks: &str) -> FilingSections {
        let mut map = BTreeMap::new();
        map.insert(SectionId::Business, business.to_string());
        map.insert(SectionId::ManagementDiscussion, mdna.to_string());
        map.insert(SectionId::RiskFactors, risks.to_string());
        FilingSections {
            filing: FilingInfo {
                accession_number: "0000000001-24-000001".to_string(),
                filing_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                report_date: None,
                form_type: "10-K".to_string(),
                company_name: "Widget Corp".to_string(),
                cik: "0000000001".to_string(),
                primary_doc: "wdgt.htm".to_string(),
            },
            sections: map,
        }
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_single_prompt_truncates_each_section() {
        let long = "b".repeat(SECTION_CHAR_BUDGET + 500);
        let prompt = build_single_prompt("WDGT", &sections("2024-11-01", &long, "Sales grew.", "Widgets may fade."));

        assert!(prompt.contains("Widget Corp (WDGT)"));
        assert!(prompt.contains(&"b".repeat(SECTION_CHAR_BUDGET)));
        assert!(!prompt.contains(&"b".repeat(SECTION_CHAR_BUDGET + 1)));
        assert!(prompt.contains("MANAGEMENT DISCUSSION & ANALYSIS (PARTIAL):\nSales grew."));
        assert!(prompt.contains("RISK FACTORS (PARTIAL):\nWidgets may fade."));
        assert!(prompt.contains("Thesis-Breaking Scenarios"));
    }

    #[test]
    fn test_single_prompt_marks_missing_sections() {
        let prompt = build_single_prompt("WDGT", &sections("2024-11-01", "We make widgets.", "", "Risks."));
        assert!(prompt.contains("MANAGEMENT DISCUSSION & ANALYSIS (PARTIAL):\n[Section not found in this filing]"));
    }

    #[test]
    fn test_longitudinal_prompt_lists_filings_in_record_order() {
        let record = FilingRecord {
            ticker: "WDGT".to_string(),
            company_name: "Widget Corp".to_string(),
            filings: vec![
                sections("2024-11-01", "New widgets.", "Up.", "Tariffs."),
                sections("2023-11-03", "Old widgets.", "Flat.", "Rates."),
            ],
        };
        let prompt = build_longitudinal_prompt("WDGT", &record);
        let newer = prompt.find("FILING 2024-11-01").unwrap();
        let older = prompt.find("FILING 2023-11-03").unwrap();
        assert!(newer < older);
        assert!(prompt.contains("last 2 10-K filings"));
        assert!(prompt.contains("Improving / Stable / Deteriorating"));
    }

    #[test]
    fn test_longitudinal_budget_is_shared() {
        let long = "r".repeat(SECTION_CHAR_BUDGET);
        let record = FilingRecord {
            ticker: "WDGT".to_string(),
            company_name: "Widget Corp".to_string(),
            filings: (0..4).map(|_| sections("2024-11-01", "", "", &long)).collect(),
        };
        let prompt = build_longitudinal_prompt("WDGT", &record);
        let share = SECTION_CHAR_BUDGET / 4;
        assert!(prompt.contains(&"r".repeat(share)));
        assert!(!prompt.contains(&"r".repeat(share + 1)));
    }
}
