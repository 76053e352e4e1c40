use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_PERSONA_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PERSONA_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct PersonaConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: DEFAULT_PERSONA_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_PERSONA_TIMEOUT_SECS),
        }
    }
}

impl PersonaConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match non_empty("PERSONA_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("PERSONA_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_PERSONA_TIMEOUT_SECS,
        };

        Ok(Self {
            endpoint: non_empty("PERSONA_API_URL").map(|url| url.trim_end_matches('/').to_string()),
            api_key: non_empty("PERSONA_API_KEY"),
            model: non_empty("PERSONA_MODEL").unwrap_or_else(|| DEFAULT_PERSONA_MODEL.to_string()),
            timeout: Duration::from_secs(timeout),
        })
    }
}
