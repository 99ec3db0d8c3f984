// src/edgar/models.rs
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::utils::error::EdgarError;

/// Form type of the annual report we analyse.
pub const ANNUAL_FORM: &str = "10-K";

/// One row of https://www.sec.gov/files/company_tickers.json
#[derive(Debug, Clone, Deserialize)]
pub struct TickerEntry {
    pub cik_str: u64,
    pub ticker: String,
}

/// The parts of the EDGAR submissions index we use.
/// Example: https://data.sec.gov/submissions/CIK0000320193.json
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySubmission {
    pub name: String,
    pub filings: Filings,
}

#[derive(Debug, Deserialize)]
pub struct Filings {
    pub recent: FilingsList,
}

/// Column-oriented list: index `i` of every vector describes the same filing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingsList {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    #[serde(default)]
    pub report_date: Vec<String>,
    pub form: Vec<String>,
    pub primary_document: Vec<String>,
}

/// A single annual filing we can download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingInfo {
    pub accession_number: String,
    pub filing_date: NaiveDate,
    pub report_date: Option<NaiveDate>,
    pub form_type: String,
    pub company_name: String,
    pub cik: String,
    pub primary_doc: String,
}

impl FilingInfo {
    /// Constructs the URL to access the primary document of this filing
    pub fn primary_doc_url(&self) -> String {
        let acc_no_dashes = self.accession_number.replace('-', "");
        let cik = self.cik.trim_start_matches('0');
        format!(
            "https://www.sec.gov/Archives/edgar/data/{}/{}/{}",
            cik, acc_no_dashes, self.primary_doc
        )
    }

    /// Fiscal year covered, taken from the period of report when present.
    pub fn fiscal_year(&self) -> i32 {
        self.report_date.unwrap_or(self.filing_date).year()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, EdgarError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| EdgarError::Parse(format!("Invalid date '{}': {}", raw, e)))
}

impl CompanySubmission {
    /// All 10-K filings from the recent list, newest first.
    pub fn annual_filings(&self, cik: &str) -> Result<Vec<FilingInfo>, EdgarError> {
        let recent = &self.filings.recent;
        let mut filings = Vec::new();

        for (i, form) in recent.form.iter().enumerate() {
            if form != ANNUAL_FORM {
                continue;
            }

            let accession_number = recent
                .accession_number
                .get(i)
                .ok_or_else(|| EdgarError::Parse("Missing accession number".to_string()))?;
            let filing_date = recent
                .filing_date
                .get(i)
                .ok_or_else(|| EdgarError::Parse("Missing filing date".to_string()))?;
            let primary_doc = recent
                .primary_document
                .get(i)
                .ok_or_else(|| EdgarError::Parse("Missing primary document".to_string()))?;
            let report_date = match recent.report_date.get(i).map(String::as_str) {
                Some(raw) if !raw.is_empty() => Some(parse_date(raw)?),
                _ => None,
            };

            filings.push(FilingInfo {
                accession_number: accession_number.clone(),
                filing_date: parse_date(filing_date)?,
                report_date,
                form_type: form.clone(),
                company_name: self.name.clone(),
                cik: cik.to_string(),
                primary_doc: primary_doc.clone(),
            });
        }

        // Sort by filing date (newest first)
        filings.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
        Ok(filings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMISSIONS: &str = r#"{
        "cik": "320193",
        "name": "Apple Inc.",
        "tickers": ["AAPL"],
        "sic": "3571",
        "filings": {
            "recent": {
                "accessionNumber": ["0000320193-23-000106", "0000320193-24-000010", "0000320193-24-000123", "0000320193-22-000108"],
                "filingDate": ["2023-11-03", "2024-02-02", "2024-11-01", "2022-10-28"],
                "reportDate": ["2023-09-30", "2023-12-30", "2024-09-28", ""],
                "form": ["10-K", "10-Q", "10-K", "10-K"],
                "primaryDocument": ["aapl-20230930.htm", "aapl-20231230.htm", "aapl-20240928.htm", "aapl-20220924.htm"]
            },
            "files": []
        }
    }"#;

    #[test]
    fn test_annual_filings_are_filtered_and_sorted() {
        let submission: CompanySubmission = serde_json::from_str(SUBMISSIONS).unwrap();
        let filings = submission.annual_filings("0000320193").unwrap();

        assert_eq!(filings.len(), 3);
        assert_eq!(filings[0].primary_doc, "aapl-20240928.htm");
        assert_eq!(filings[1].primary_doc, "aapl-20230930.htm");
        assert_eq!(filings[2].report_date, None);
        assert!(filings.iter().all(|f| f.form_type == ANNUAL_FORM));
        assert_eq!(filings[0].company_name, "Apple Inc.");
        assert_eq!(filings[0].fiscal_year(), 2024);
        assert_eq!(filings[2].fiscal_year(), 2022);
    }

    #[test]
    fn test_primary_doc_url() {
        let submission: CompanySubmission = serde_json::from_str(SUBMISSIONS).unwrap();
        let filings = submission.annual_filings("0000320193").unwrap();
        assert_eq!(
            filings[0].primary_doc_url(),
            "https://www.sec.gov/Archives/edgar/data/320193/000032019324000123/aapl-20240928.htm"
        );
    }

    #[test]
    fn test_bad_date_is_parse_error() {
        let json = SUBMISSIONS.replace("2024-11-01", "11/01/2024");
        let submission: CompanySubmission = serde_json::from_str(&json).unwrap();
        assert!(matches!(submission.annual_filings("1"), Err(EdgarError::Parse(_))));
    }
}
