// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::FilingSections;
use crate::utils::error::StorageError;

/// Writes extracted sections and reports under `<base>/<TICKER>/<label>/`.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    fn target_dir(&self, ticker: &str, label: &str) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join(ticker.to_uppercase()).join(label);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }

    /// Saves each non-empty section as text plus one JSON metadata file.
    /// Returns the paths written.
    pub fn save_sections(&self, ticker: &str, filing: &FilingSections) -> Result<Vec<PathBuf>, StorageError> {
        let ticker = ticker.to_uppercase();
        let date = filing.filing.filing_date.to_string();
        let target_dir = self.target_dir(&ticker, &date)?;
        let mut written = Vec::new();

        for (id, body) in &filing.sections {
            if body.is_empty() {
                continue;
            }
            let file_path = target_dir.join(format!("{}_{}_{}.txt", ticker, date, id.slug()));
            fs::write(&file_path, body).map_err(StorageError::IoError)?;
            tracing::info!("Saved {} to {}", id, file_path.display());
            written.push(file_path);
        }

        let sections: Vec<serde_json::Value> = filing
            .sections
            .iter()
            .map(|(id, body)| {
                serde_json::json!({
                    "section": id.label(),
                    "title": id.title(),
                    "found": !body.is_empty(),
                    "content_length": body.len(),
                })
            })
            .collect();
        let metadata = serde_json::json!({
            "ticker": ticker,
            "company_name": filing.filing.company_name,
            "cik": filing.filing.cik,
            "accession_number": filing.filing.accession_number,
            "filing_date": filing.filing.filing_date,
            "fiscal_year": filing.filing.fiscal_year(),
            "source_url": filing.filing.primary_doc_url(),
            "sections": sections,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let meta_path = target_dir.join(format!("{}_{}_sections_meta.json", ticker, date));
        fs::write(&meta_path, metadata_str).map_err(StorageError::IoError)?;
        tracing::info!("Saved metadata to {}", meta_path.display());
        written.push(meta_path);

        Ok(written)
    }

    /// Saves a generated report as Markdown under `<TICKER>/<label>/`.
    pub fn save_report(&self, ticker: &str, label: &str, report: &str) -> Result<PathBuf, StorageError> {
        let ticker = ticker.to_uppercase();
        let target_dir = self.target_dir(&ticker, label)?;
        let file_path = target_dir.join(format!("{}_{}_analysis.md", ticker, label));
        let contents = format!("# Qualitative Analysis: {}\n\n{}\n", ticker, report);
        fs::write(&file_path, contents).map_err(StorageError::IoError)?;
        tracing::info!("Saved report to {}", file_path.display());
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::FilingInfo;
    use crate::extractors::SectionId;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn filing_sections() -> FilingSections {
        let mut sections = BTreeMap::new();
        sections.insert(SectionId::Business, "Item 1. Business\nWe make widgets.".to_string());
        sections.insert(SectionId::RiskFactors, String::new());
        FilingSections {
            filing: FilingInfo {
                accession_number: "0000000001-24-000007".to_string(),
                filing_date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
                report_date: NaiveDate::from_ymd_opt(2024, 9, 28),
                form_type: "10-K".to_string(),
                company_name: "Widget Corp".to_string(),
                cik: "0000000001".to_string(),
                primary_doc: "wdgt-20240928.htm".to_string(),
            },
            sections,
        }
    }

    #[test]
    fn test_save_sections_writes_text_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("out")).unwrap();
        let written = storage.save_sections("wdgt", &filing_sections()).unwrap();

        let target = dir.path().join("out").join("WDGT").join("2024-11-01");
        let business = target.join("WDGT_2024-11-01_item_1_business.txt");
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(&business).unwrap(), "Item 1. Business\nWe make widgets.");
        assert!(!target.join("WDGT_2024-11-01_item_1a_risk_factors.txt").exists());

        let meta: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(target.join("WDGT_2024-11-01_sections_meta.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(meta["ticker"], "WDGT");
        assert_eq!(meta["fiscal_year"], 2024);
        assert_eq!(meta["filing_date"], "2024-11-01");
        assert_eq!(meta["sections"][1]["found"], false);
    }

    #[test]
    fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let path = storage.save_report("wdgt", "2024-11-01", "Moat: Strong").unwrap();
        assert_eq!(path, dir.path().join("WDGT/2024-11-01/WDGT_2024-11-01_analysis.md"));
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("# Qualitative Analysis: WDGT"));
        assert!(contents.contains("Moat: Strong"));
    }
}
