// src/edgar/client.rs
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header;
use tokio::sync::OnceCell;

use crate::edgar::models::{CompanySubmission, FilingInfo, TickerEntry};
use crate::utils::error::EdgarError;

const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const SUBMISSIONS_BASE_URL: &str = "https://data.sec.gov/submissions";
// SEC asks for 10 requests/second max. Be conservative. >100ms delay.
pub const EDGAR_REQUEST_DELAY_MS: u64 = 150;
const EDGAR_TIMEOUT_SECS: u64 = 60;

/// Where filings come from. The pipeline only talks to this trait so tests can
/// substitute canned documents for EDGAR.
#[allow(async_fn_in_trait)]
pub trait FilingSource {
    /// Ticker to zero-padded CIK, `None` when the ticker is unknown.
    async fn resolve_identifier(&self, ticker: &str) -> Result<Option<String>, EdgarError>;

    /// Annual filings for a CIK, newest first.
    async fn list_annual_filings(&self, cik: &str) -> Result<Vec<FilingInfo>, EdgarError>;

    /// Raw document content at `url`.
    async fn fetch_document(&self, url: &str) -> Result<String, EdgarError>;
}

/// EDGAR HTTP client. Every request waits on one rate limiter so callers may
/// share a client freely without exceeding the SEC's request rate.
pub struct EdgarClient {
    http: reqwest::Client,
    rate_limiter: DefaultDirectRateLimiter,
    ticker_map: OnceCell<HashMap<String, String>>,
}

impl EdgarClient {
    /// Creates a client that identifies itself with `user_agent` (required by the SEC).
    pub fn new(user_agent: &str) -> Result<Self, EdgarError> {
        Self::with_request_delay(user_agent, Duration::from_millis(EDGAR_REQUEST_DELAY_MS))
    }

    /// Like [`new`](Self::new) but allows one request per `delay` instead of the default.
    fn with_request_delay(user_agent: &str, delay: Duration) -> Result<Self, EdgarError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(EDGAR_TIMEOUT_SECS))
            .build()?;
        tracing::debug!("Using User-Agent: {}", user_agent);

        // A zero period means unthrottled
        let quota = Quota::with_period(delay).unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));

        Ok(Self {
            http,
            rate_limiter: RateLimiter::direct(quota),
            ticker_map: OnceCell::new(),
        })
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response, EdgarError> {
        self.rate_limiter.until_ready().await;
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, accept)
            .send()
            .await?; // Propagates reqwest::Error as EdgarError::Network

        check_status(response.status(), url)?;
        Ok(response)
    }

    async fn ticker_map(&self) -> Result<&HashMap<String, String>, EdgarError> {
        self.ticker_map
            .get_or_try_init(|| async {
                let entries: HashMap<String, TickerEntry> =
                    self.get(COMPANY_TICKERS_URL, "application/json").await?.json().await?;
                let map = build_ticker_map(entries.into_values());
                tracing::info!("Loaded {} tickers from EDGAR", map.len());
                Ok(map)
            })
            .await
    }

    /// Fetches the company submission index for a given CIK
    pub async fn company_submissions(&self, cik: &str) -> Result<CompanySubmission, EdgarError> {
        let url = format!("{}/CIK{}.json", SUBMISSIONS_BASE_URL, cik);
        let response = self.get(&url, "application/json").await?;
        response
            .json::<CompanySubmission>()
            .await
            .map_err(|e| EdgarError::Parse(format!("Submissions for CIK {}: {}", cik, e)))
    }
}

impl FilingSource for EdgarClient {
    async fn resolve_identifier(&self, ticker: &str) -> Result<Option<String>, EdgarError> {
        let map = self.ticker_map().await?;
        Ok(map.get(&ticker.trim().to_uppercase()).cloned())
    }

    async fn list_annual_filings(&self, cik: &str) -> Result<Vec<FilingInfo>, EdgarError> {
        let submission = self.company_submissions(cik).await?;
        submission.annual_filings(cik)
    }

    async fn fetch_document(&self, url: &str) -> Result<String, EdgarError> {
        tracing::info!("Downloading document from: {}", url);
        // SEC uses various content types, but often text/html for filings
        let response = self
            .get(url, "application/xml,text/html,text/plain,*/*")
            .await?;
        let body = response.text().await?;
        tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// Uppercased ticker to CIK formatted with leading zeros to 10 digits.
fn build_ticker_map(entries: impl IntoIterator<Item = TickerEntry>) -> HashMap<String, String> {
    entries
        .into_iter()
        .map(|entry| (entry.ticker.to_uppercase(), format!("{:010}", entry.cik_str)))
        .collect()
}

fn check_status(status: reqwest::StatusCode, url: &str) -> Result<(), EdgarError> {
    if status.is_success() {
        return Ok(());
    }
    tracing::error!("HTTP error status: {} for URL: {}", status, url);
    match status {
        reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!("Received {} - check User-Agent and rate limits.", status);
            Err(EdgarError::RateLimited)
        }
        reqwest::StatusCode::NOT_FOUND => Err(EdgarError::FilingDocNotFound(url.to_string())),
        _ => Err(EdgarError::Http(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::time::Instant;

    #[test]
    fn test_ticker_map_pads_cik_and_uppercases() {
        let entries: HashMap<String, TickerEntry> = serde_json::from_str(
            r#"{"0": {"cik_str": 320193, "ticker": "aapl", "title": "Apple Inc."},
                "1": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"}}"#,
        )
        .unwrap();
        let map = build_ticker_map(entries.into_values());
        assert_eq!(map.get("AAPL").map(String::as_str), Some("0000320193"));
        assert_eq!(map.get("MSFT").map(String::as_str), Some("0000789019"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(StatusCode::OK, "u").is_ok());
        assert!(matches!(check_status(StatusCode::FORBIDDEN, "u"), Err(EdgarError::RateLimited)));
        assert!(matches!(
            check_status(StatusCode::TOO_MANY_REQUESTS, "u"),
            Err(EdgarError::RateLimited)
        ));
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "https://x/doc.htm"),
            Err(EdgarError::FilingDocNotFound(url)) if url == "https://x/doc.htm"
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, "u"),
            Err(EdgarError::Http(StatusCode::BAD_GATEWAY))
        ));
    }

    #[test]
    fn test_rate_limiter_spaces_requests() {
        let client =
            EdgarClient::with_request_delay("filing_scanner tests test@example.com", Duration::from_millis(40))
                .unwrap();
        tokio_test::block_on(async {
            let started = Instant::now();
            client.rate_limiter.until_ready().await;
            client.rate_limiter.until_ready().await;
            client.rate_limiter.until_ready().await;
            assert!(started.elapsed() >= Duration::from_millis(75));
        });
        // Only one request fits in each period
        assert!(client.rate_limiter.check().is_err());
    }

    #[test]
    fn test_default_client_allows_first_request_immediately() {
        let client = EdgarClient::new("filing_scanner tests test@example.com").unwrap();
        assert!(client.rate_limiter.check().is_ok());
        assert!(client.rate_limiter.check().is_err());
    }
}
