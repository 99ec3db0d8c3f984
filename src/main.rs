// src/main.rs
mod analysis;
mod edgar;
mod extractors;
mod pipeline;
mod storage;
mod utils;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use analysis::prompt::{build_longitudinal_prompt, build_single_prompt, truncate_chars};
use analysis::{GeminiClient, ReportComposer, ANALYSIS_ERROR_PREFIX};
use edgar::{EdgarClient, FilingSource};
use extractors::section::{DEFAULT_BOUNDARY_SKIP, DEFAULT_MAX_SPAN_LEN, DEFAULT_TOC_LOOKAHEAD};
use extractors::{ExtractionConfig, SectionExtractor};
use pipeline::{CollectOptions, FilingOrder, FilingRecord};
use storage::StorageManager;
use utils::config::Settings;
use utils::console::{print_error, print_panel, print_warning, with_spinner};
use utils::error::EdgarError;
use utils::AppError;

const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Qualitative stock analysis from SEC 10-K filings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a stock qualitatively using its 10-K filings
    Analyze {
        #[command(flatten)]
        target: FilingArgs,

        /// Gemini model (defaults to GEMINI_MODEL or gemini-2.5-flash)
        #[arg(long)]
        model: Option<String>,
    },
    /// Extract the narrative sections without calling the generation API
    Extract {
        #[command(flatten)]
        target: FilingArgs,

        /// Characters of each section to preview
        #[arg(long, default_value_t = 300)]
        preview: usize,
    },
    /// Check available 10-K filings for a ticker
    CheckFilings {
        /// Ticker symbol of the company
        ticker: String,
    },
}

#[derive(Args, Debug)]
struct FilingArgs {
    /// Ticker symbol of the company
    ticker: String,

    /// Number of most recent 10-K filings to use (more than one compares filings over time)
    #[arg(short = 'n', long, default_value_t = 1)]
    filings: usize,

    /// Present filings oldest first instead of newest first
    #[arg(long)]
    oldest_first: bool,

    /// Output directory for extracted sections and reports (nothing is saved when omitted)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Debug mode - save raw, normalized and heading-annotated filing text
    #[arg(short, long)]
    debug: bool,

    #[command(flatten)]
    extraction: ExtractionArgs,
}

#[derive(Args, Debug)]
struct ExtractionArgs {
    /// Longest section returned when no closing heading is found
    #[arg(long, env = "FILING_MAX_SPAN_LEN", default_value_t = DEFAULT_MAX_SPAN_LEN)]
    max_span_len: usize,

    /// Bytes skipped past a heading before searching for the next one
    #[arg(long, env = "FILING_BOUNDARY_SKIP", default_value_t = DEFAULT_BOUNDARY_SKIP)]
    boundary_skip: usize,

    /// Window inspected after a heading when classifying table-of-contents entries
    #[arg(long, env = "FILING_TOC_LOOKAHEAD", default_value_t = DEFAULT_TOC_LOOKAHEAD)]
    toc_lookahead: usize,
}

impl ExtractionArgs {
    fn extractor(&self) -> Result<SectionExtractor, AppError> {
        if self.max_span_len == 0 {
            return Err(AppError::Config("--max-span-len must be at least 1".to_string()));
        }
        Ok(SectionExtractor::with_config(ExtractionConfig {
            max_span_len: self.max_span_len,
            boundary_skip: self.boundary_skip,
            toc_lookahead: self.toc_lookahead,
        }))
    }
}

impl FilingArgs {
    fn collect_options(&self) -> CollectOptions {
        let debug_root = self.debug.then(|| {
            self.output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
        });
        CollectOptions {
            limit: self.filings.max(1),
            order: if self.oldest_first {
                FilingOrder::OldestFirst
            } else {
                FilingOrder::NewestFirst
            },
            debug_root,
        }
    }

    fn storage(&self) -> Result<Option<StorageManager>, AppError> {
        Ok(self.output_dir.as_ref().map(StorageManager::new).transpose()?)
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let cli = Cli::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(if cli.verbose { "debug" } else { "info" });
    tracing::debug!("Starting processing for args: {:?}", cli);

    // 3. Environment settings
    let settings = Settings::from_env();

    let result = match cli.command {
        Command::Analyze { target, model } => run_analyze(&settings, &target, model).await,
        Command::Extract { target, preview } => run_extract(&settings, &target, preview).await,
        Command::CheckFilings { ticker } => run_check_filings(&settings, &ticker).await,
    };

    // 4. Report failures on the console instead of as a debug dump
    if let Err(e) = result {
        tracing::debug!("Exiting with error: {:?}", e);
        print_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

async fn collect_record(settings: &Settings, target: &FilingArgs) -> Result<FilingRecord, AppError> {
    let extractor = target.extraction.extractor()?;
    let client = EdgarClient::new(&settings.sec_user_agent)?;
    let options = target.collect_options();
    let ticker = target.ticker.trim().to_uppercase();
    let record = with_spinner(
        format!("Fetching data for {}...", ticker),
        pipeline::collect_filings(&client, &ticker, extractor, &options),
    )
    .await?;

    for filing in &record.filings {
        for id in filing.missing() {
            print_warning(&format!("{} not found in the filing of {}", id, filing.filing.filing_date));
        }
    }
    Ok(record)
}

fn save_sections(storage: Option<&StorageManager>, record: &FilingRecord) {
    let Some(storage) = storage else {
        return;
    };
    for filing in &record.filings {
        if let Err(e) = storage.save_sections(&record.ticker, filing) {
            tracing::error!("Failed to save sections for {}: {}", filing.filing.filing_date, e);
        }
    }
}

async fn run_analyze(settings: &Settings, target: &FilingArgs, model: Option<String>) -> Result<(), AppError> {
    // Fail before any download when the key is missing
    let api_key = settings.require_api_key()?;
    let model = model.unwrap_or_else(|| settings.gemini_model.clone());
    let composer = ReportComposer::new(GeminiClient::new(model, api_key)?);
    let storage = target.storage()?;

    let record = collect_record(settings, target).await?;
    save_sections(storage.as_ref(), &record);

    let (prompt, label) = match record.filings.as_slice() {
        [single] => (
            build_single_prompt(&record.ticker, single),
            single.filing.filing_date.to_string(),
        ),
        filings => {
            let oldest = filings.iter().map(|f| f.filing.filing_date).min();
            let newest = filings.iter().map(|f| f.filing.filing_date).max();
            let label = match (oldest, newest) {
                (Some(oldest), Some(newest)) => format!("longitudinal_{}_{}", oldest, newest),
                _ => "longitudinal".to_string(),
            };
            (build_longitudinal_prompt(&record.ticker, &record), label)
        }
    };

    let report = with_spinner("Analyzing with Gemini...", composer.compose(&prompt)).await;
    if report.starts_with(ANALYSIS_ERROR_PREFIX) {
        print_error(&report);
    } else {
        print_panel(&format!("Qualitative Analysis: {}", record.ticker), &report);
    }

    if let Some(storage) = &storage {
        match storage.save_report(&record.ticker, &label, &report) {
            Ok(path) => tracing::info!("Saved report to: {}", path.display()),
            Err(e) => tracing::error!("Failed to save report: {}", e),
        }
    }
    Ok(())
}

async fn run_extract(settings: &Settings, target: &FilingArgs, preview: usize) -> Result<(), AppError> {
    let storage = target.storage()?;
    let record = collect_record(settings, target).await?;
    save_sections(storage.as_ref(), &record);

    for filing in &record.filings {
        let mut body = String::new();
        for (id, text) in &filing.sections {
            if text.is_empty() {
                body.push_str(&format!("{}: (not found)\n\n", id));
            } else {
                body.push_str(&format!(
                    "{}: {} chars\n{}\n\n",
                    id,
                    text.chars().count(),
                    truncate_chars(text, preview)
                ));
            }
        }
        print_panel(
            &format!(
                "{} 10-K filed {} (FY {})",
                record.company_name,
                filing.filing.filing_date,
                filing.filing.fiscal_year()
            ),
            body.trim_end(),
        );
    }
    Ok(())
}

async fn run_check_filings(settings: &Settings, ticker: &str) -> Result<(), AppError> {
    let client = EdgarClient::new(&settings.sec_user_agent)?;
    let ticker = ticker.trim().to_uppercase();
    let filings = with_spinner(format!("Checking filings for {}...", ticker), async {
        let cik = client
            .resolve_identifier(&ticker)
            .await?
            .ok_or_else(|| EdgarError::TickerNotFound(ticker.clone()))?;
        client.list_annual_filings(&cik).await
    })
    .await?;

    if filings.is_empty() {
        print_warning(&format!("No 10-K filings found for {}.", ticker));
        return Ok(());
    }

    println!("Found {} 10-K filings for {}:", filings.len(), ticker);
    for filing in &filings {
        println!(" - {} (fiscal year {}) {}", filing.filing_date, filing.fiscal_year(), filing.primary_doc_url());
    }
    Ok(())
}
