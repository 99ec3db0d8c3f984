// src/analysis/gemini.rs
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::utils::error::AnalysisError;

const GENERATE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GENERATE_TIMEOUT_SECS: u64 = 180;

/// Minimal client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(GENERATE_TIMEOUT_SECS))
            .build()
            .map_err(|err| AnalysisError::Network(err.to_string()))?;
        Ok(Self {
            http,
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` as a single user turn and returns the first candidate's text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        let endpoint = format!("{}/{}:generateContent", GENERATE_BASE_URL, self.model);
        let payload = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{"text": prompt}]
                }
            ],
            "generationConfig": {
                "temperature": 0.2
            }
        });

        tracing::info!("Requesting analysis from {} ({} prompt chars)", self.model, prompt.len());
        let response = self
            .http
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AnalysisError::Timeout
                } else {
                    AnalysisError::Network(err.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(AnalysisError::Auth),
            StatusCode::TOO_MANY_REQUESTS => return Err(AnalysisError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(AnalysisError::InvalidResponse(format!("status {status} body {body}")));
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| AnalysisError::InvalidResponse(err.to_string()))?;
        if let Some(usage) = body.get("usageMetadata") {
            tracing::debug!("Token usage: {}", usage);
        }
        candidate_text(&body)
    }
}

/// Concatenates the text parts of the first candidate.
fn candidate_text(body: &Value) -> Result<String, AnalysisError> {
    let parts = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = body
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("missing text candidate");
            AnalysisError::InvalidResponse(reason.to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        return Err(AnalysisError::InvalidResponse("empty text candidate".to_string()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_text_joins_parts() {
        let body = json!({
            "candidates": [
                {"content": {"parts": [{"text": "1. Durable Competitive Advantages: Strong\n"}, {"text": "Justification: brand."}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 10}
        });
        assert_eq!(
            candidate_text(&body).unwrap(),
            "1. Durable Competitive Advantages: Strong\nJustification: brand."
        );
    }

    #[test]
    fn test_candidate_text_reports_block_reason() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        match candidate_text(&body) {
            Err(AnalysisError::InvalidResponse(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("unexpected result: {:?}", other),
        }

        let empty = json!({"candidates": [{"content": {"parts": []}}]});
        assert!(matches!(candidate_text(&empty), Err(AnalysisError::InvalidResponse(_))));
    }
}
