// src/pipeline.rs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::task::JoinSet;

use crate::edgar::{FilingInfo, FilingSource};
use crate::extractors::{normalize, SectionExtractor, SectionId};
use crate::utils::debug;
use crate::utils::error::EdgarError;
use crate::utils::AppError;

/// Presentation order of a filing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilingOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Narrative sections extracted from one filing. Absent sections map to "".
#[derive(Debug, Clone)]
pub struct FilingSections {
    pub filing: FilingInfo,
    pub sections: BTreeMap<SectionId, String>,
}

impl FilingSections {
    pub fn section(&self, id: &SectionId) -> &str {
        self.sections.get(id).map_or("", String::as_str)
    }

    pub fn missing(&self) -> Vec<&SectionId> {
        self.sections
            .iter()
            .filter(|(_, body)| body.is_empty())
            .map(|(id, _)| id)
            .collect()
    }
}

/// Sections of several filings of one company, ordered by filing date.
#[derive(Debug, Clone)]
pub struct FilingRecord {
    pub ticker: String,
    pub company_name: String,
    pub filings: Vec<FilingSections>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// How many of the newest filings to process (at least one).
    pub limit: usize,
    pub order: FilingOrder,
    /// Root under which `<TICKER>/<date>/debug` artifacts are written.
    pub debug_root: Option<PathBuf>,
}

/// Extracts the narrative sections from normalized filing text.
pub fn extract_filing(text: &str, filing: FilingInfo, extractor: &SectionExtractor) -> FilingSections {
    let mut sections = BTreeMap::new();
    for id in SectionId::NARRATIVE.iter() {
        let Some(following) = id.default_following() else {
            continue;
        };
        let body = extractor.extract_text(text, id, &following);
        if body.is_empty() {
            tracing::warn!(
                "{} not found in {} filing of {} ({})",
                id,
                filing.form_type,
                filing.company_name,
                filing.filing_date
            );
        } else {
            tracing::info!("Extracted {} ({} bytes) from filing {}", id, body.len(), filing.accession_number);
        }
        sections.insert(id.clone(), body.to_string());
    }
    FilingSections { filing, sections }
}

fn process_document(
    raw: &str,
    filing: FilingInfo,
    extractor: &SectionExtractor,
    debug_dir: Option<&Path>,
) -> FilingSections {
    let clean = normalize(raw);
    tracing::debug!("Normalized {} bytes of markup into {} bytes of text", raw.len(), clean.len());

    if let Some(dir) = debug_dir {
        if let Err(e) = debug::save_debug_artifacts(dir, raw, &clean, extractor, &SectionId::NARRATIVE) {
            tracing::warn!("Failed to save debug artifacts: {}", e);
        }
    }

    extract_filing(&clean, filing, extractor)
}

fn sort_filings(filings: &mut [FilingSections], order: FilingOrder) {
    match order {
        FilingOrder::NewestFirst => filings.sort_by(|a, b| b.filing.filing_date.cmp(&a.filing.filing_date)),
        FilingOrder::OldestFirst => filings.sort_by(|a, b| a.filing.filing_date.cmp(&b.filing.filing_date)),
    }
}

/// Resolves `ticker`, downloads its newest annual filings one at a time (the
/// source owns rate limiting) and extracts each document on the blocking pool.
/// Failed downloads are skipped; an error is returned only when nothing succeeds.
pub async fn collect_filings<S: FilingSource>(
    source: &S,
    ticker: &str,
    extractor: SectionExtractor,
    options: &CollectOptions,
) -> Result<FilingRecord, AppError> {
    let ticker = ticker.trim().to_uppercase();
    let cik = source
        .resolve_identifier(&ticker)
        .await?
        .ok_or_else(|| EdgarError::TickerNotFound(ticker.clone()))?;
    tracing::info!("Resolved {} to CIK {}", ticker, cik);

    let mut filings = source.list_annual_filings(&cik).await?;
    if filings.is_empty() {
        return Err(AppError::Processing(format!("No 10-K filings found for ticker {}", ticker)));
    }
    filings.truncate(options.limit.max(1));
    let company_name = filings[0].company_name.clone();
    tracing::info!("Processing {} 10-K filing(s) for {}", filings.len(), company_name);

    let mut tasks = JoinSet::new();
    let mut failure_count = 0;
    for filing in filings {
        let url = filing.primary_doc_url();
        match source.fetch_document(&url).await {
            Ok(raw) => {
                tracing::info!("Downloaded filing {} ({} bytes)", filing.filing_date, raw.len());
                let debug_dir = options.debug_root.as_ref().map(|root| {
                    root.join(&ticker)
                        .join(filing.filing_date.to_string())
                        .join("debug")
                });
                tasks.spawn_blocking(move || process_document(&raw, filing, &extractor, debug_dir.as_deref()));
            }
            Err(e) => {
                tracing::error!("Failed to download filing {}: {}", filing.filing_date, e);
                failure_count += 1;
            }
        }
    }

    let mut processed = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(sections) => processed.push(sections),
            Err(e) => {
                tracing::error!("Extraction task failed: {}", e);
                failure_count += 1;
            }
        }
    }

    tracing::info!("Processing finished. Success: {}, Failures: {}", processed.len(), failure_count);
    if processed.is_empty() {
        return Err(AppError::Processing(format!(
            "Failed to process any of {} filings for {}",
            failure_count, ticker
        )));
    }

    sort_filings(&mut processed, options.order);
    Ok(FilingRecord {
        ticker,
        company_name,
        filings: processed,
    })
}
