//! Configuration schema for finchat.toml.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A credential read from config or the environment. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, or `None` when the credential is not configured.
    pub fn expose(&self) -> Option<&str> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    pub fn is_set(&self) -> bool {
        self.expose().is_some()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "Secret(***)")
        } else {
            write!(f, "Secret(<unset>)")
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinchatConfig {
    /// Display name of the assistant.
    pub name: String,

    /// OpenAI-compatible API base URL (without `/v1`).
    pub model_api_url: String,

    pub model_api_key: Secret,

    /// Model used for both rounds of a cycle.
    pub inference_model: String,

    pub max_tokens_per_turn: u32,

    pub temperature: f64,

    /// Upper bound for each model call. Expiry aborts the cycle.
    pub model_timeout_secs: u64,

    /// Upper bound for each tool call. Expiry fails only that call.
    pub tool_timeout_secs: u64,

    /// Extra operator instructions appended to the system prompt.
    pub persona: String,

    pub coingecko_api_url: String,

    pub news_api_url: String,
    pub news_api_key: Secret,

    pub alpha_vantage_api_url: String,
    pub alpha_vantage_api_key: Secret,

    pub exchange_rate_api_url: String,
    pub exchange_rate_api_key: Secret,

    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Config version.
    pub version: u32,
}

impl Default for FinchatConfig {
    fn default() -> Self {
        Self {
            name: "finchat".into(),
            model_api_url: "https://api.openai.com".into(),
            model_api_key: Secret::default(),
            inference_model: "gpt-4o-mini".into(),
            max_tokens_per_turn: 2048,
            temperature: 0.7,
            model_timeout_secs: 60,
            tool_timeout_secs: 20,
            persona: String::new(),
            coingecko_api_url: "https://api.coingecko.com/api/v3".into(),
            news_api_url: "https://newsapi.org/v2".into(),
            news_api_key: Secret::default(),
            alpha_vantage_api_url: "https://www.alphavantage.co".into(),
            alpha_vantage_api_key: Secret::default(),
            exchange_rate_api_url: "https://v6.exchangerate-api.com/v6".into(),
            exchange_rate_api_key: Secret::default(),
            log_level: "info".into(),
            version: 1,
        }
    }
}

/// Environment variables that override credentials from the file.
pub const ENV_MODEL_API_KEY: &str = "FINCHAT_MODEL_API_KEY";
pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const ENV_ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const ENV_EXCHANGE_RATE_API_KEY: &str = "EXCHANGE_RATE_API_KEY";

impl FinchatConfig {
    /// Override credentials from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Override credentials using `lookup`; empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let slots: [(&str, &mut Secret); 4] = [
            (ENV_MODEL_API_KEY, &mut self.model_api_key),
            (ENV_NEWS_API_KEY, &mut self.news_api_key),
            (ENV_ALPHA_VANTAGE_API_KEY, &mut self.alpha_vantage_api_key),
            (ENV_EXCHANGE_RATE_API_KEY, &mut self.exchange_rate_api_key),
        ];
        for (var, slot) in slots {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                *slot = Secret::new(value);
            }
        }
        self
    }

    /// Log filter used when `RUST_LOG` is unset; an explicit flag wins.
    pub fn log_level_or<'a>(&'a self, flag: Option<&'a str>) -> &'a str {
        flag.map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.log_level)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs.max(1))
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("sk-live-123");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(format!("{:?}", Secret::default()), "Secret(<unset>)");
        assert_eq!(secret.expose(), Some("sk-live-123"));
        assert!(Secret::new("   ").expose().is_none());
    }

    #[test]
    fn env_overrides_replace_credentials() {
        let config = FinchatConfig {
            news_api_key: Secret::new("from-file"),
            ..FinchatConfig::default()
        }
        .with_overrides_from(|key| match key {
            ENV_NEWS_API_KEY => Some("from-env".into()),
            ENV_MODEL_API_KEY => Some("".into()),
            _ => None,
        });

        assert_eq!(config.news_api_key.expose(), Some("from-env"));
        assert!(!config.model_api_key.is_set());
        assert!(!config.exchange_rate_api_key.is_set());
    }

    #[test]
    fn log_level_flag_overrides_config() {
        let config = FinchatConfig {
            log_level: "debug".into(),
            ..FinchatConfig::default()
        };
        assert_eq!(config.log_level_or(None), "debug");
        assert_eq!(config.log_level_or(Some("warn")), "warn");
        assert_eq!(config.log_level_or(Some(" ")), "debug");
        assert_eq!(FinchatConfig::default().log_level_or(None), "info");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: FinchatConfig = toml::from_str(
            r#"
            inference_model = "gpt-4o"
            news_api_key = "abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.inference_model, "gpt-4o");
        assert_eq!(config.news_api_key.expose(), Some("abc"));
        assert_eq!(config.tool_timeout_secs, 20);
        assert_eq!(config.news_api_url, "https://newsapi.org/v2");
    }
}
