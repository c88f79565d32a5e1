use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::util::env_non_empty;

pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Key values that installers and sample files ship with; never real credentials.
pub const PLACEHOLDER_API_KEYS: &[&str] = &["unset", "YOUR_API_KEY_HERE", "YOUR_GEMINI_API_KEY_HERE"];

const API_KEY_ENV: &str = "PENWRIGHT_API_KEY";
const MODEL_ENV: &str = "PENWRIGHT_MODEL";
const TEMPERATURE_ENV: &str = "PENWRIGHT_TEMPERATURE";
const API_URL_ENV: &str = "PENWRIGHT_API_URL";

/// Immutable settings snapshot for one `GenerationClient`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        let model = env_non_empty(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let temperature = env_non_empty(TEMPERATURE_ENV)
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(DEFAULT_TEMPERATURE);
        let api_url = env_non_empty(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            api_key,
            model,
            temperature,
            api_url,
        })
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid {API_URL_ENV} '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if !self.temperature.is_finite() || !(0.0..=1.0).contains(&self.temperature) {
            bail!(
                "Invalid temperature {}: expected a value between 0.0 and 1.0",
                self.temperature
            );
        }

        if self.model.trim().is_empty() {
            bail!("Model name must not be empty");
        }

        Ok(())
    }

    /// False for empty keys and for any placeholder sentinel.
    pub fn has_usable_key(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty()
            && !PLACEHOLDER_API_KEYS
                .iter()
                .any(|placeholder| key.eq_ignore_ascii_case(placeholder))
    }

    pub fn effective_model(&self) -> &str {
        let model = self.model.trim();
        if model.is_empty() {
            DEFAULT_MODEL
        } else {
            model
        }
    }

    pub fn effective_temperature(&self) -> f32 {
        if self.temperature.is_finite() {
            self.temperature.clamp(0.0, 1.0)
        } else {
            DEFAULT_TEMPERATURE
        }
    }
}
