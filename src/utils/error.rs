// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 500 Internal Server Error

    #[error("SEC rate limit likely exceeded (check SEC_USER_AGENT)")]
    RateLimited,

    #[error("Ticker {0} is not listed in the EDGAR company index")]
    TickerNotFound(String),

    #[error("Could not find filing document: {0}")]
    FilingDocNotFound(String),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Generation request failed: {0}")]
    Network(String),

    #[error("Generation request timed out")]
    Timeout,

    #[error("Generation API rejected the API key")]
    Auth,

    #[error("Generation API rate limit exceeded")]
    RateLimited,

    #[error("Unexpected generation response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("AI processing failed: {0}")]
    Ai(#[from] AnalysisError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
