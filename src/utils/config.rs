// src/utils/config.rs
use crate::utils::error::AppError;

/// SEC asks automated clients to identify themselves with a contact address.
pub const DEFAULT_USER_AGENT: &str = "filing_scanner/0.1 (contact@example.com)";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment-derived settings shared by the commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub sec_user_agent: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Settings {
    /// Reads `SEC_USER_AGENT`, `GEMINI_API_KEY` and `GEMINI_MODEL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            sec_user_agent: non_empty("SEC_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn require_api_key(&self) -> Result<&str, AppError> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("GEMINI_API_KEY not found in environment".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = settings_from(&[]);
        assert_eq!(settings.sec_user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.gemini_model, DEFAULT_MODEL);
        assert!(settings.gemini_api_key.is_none());
        assert!(matches!(settings.require_api_key(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_values_are_trimmed_and_blank_is_unset() {
        let settings = settings_from(&[
            ("SEC_USER_AGENT", "  Acme Research ops@acme.test "),
            ("GEMINI_API_KEY", "   "),
            ("GEMINI_MODEL", "gemini-2.5-pro"),
        ]);
        assert_eq!(settings.sec_user_agent, "Acme Research ops@acme.test");
        assert_eq!(settings.gemini_model, "gemini-2.5-pro");
        assert!(settings.gemini_api_key.is_none());

        let settings = settings_from(&[("GEMINI_API_KEY", "k-123")]);
        assert_eq!(settings.require_api_key().unwrap(), "k-123");
    }
}
