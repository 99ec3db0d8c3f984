// src/analysis/mod.rs
pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;

/// Leading text of a report that stands in for a failed generation.
pub const ANALYSIS_ERROR_PREFIX: &str = "Error during analysis";

/// Best-effort forwarding of prompts to the generation service: failures come
/// back as an error string instead of aborting the run.
pub struct ReportComposer {
    client: GeminiClient,
}

impl ReportComposer {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub async fn compose(&self, prompt: &str) -> String {
        match self.client.generate(prompt).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Analysis with {} failed: {}", self.client.model(), e);
                format!("{}: {}", ANALYSIS_ERROR_PREFIX, e)
            }
        }
    }
}
