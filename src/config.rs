//! Connection settings for the upstream chat-completions API.

use crate::{Error, Result};
use std::env::VarError;
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Immutable credential / endpoint / model triple shared by every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    api_key: String,
    base_url: String,
    model: String,
}

impl Config {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`, loading a
    /// `.env` file first when one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| dotenvy::var(key))
    }

    fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> dotenvy::Result<String>,
    {
        let api_key = read_var(&lookup, "OPENAI_API_KEY")?
            .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".to_string()))?;
        let base_url =
            read_var(&lookup, "OPENAI_BASE_URL")?.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = read_var(&lookup, "OPENAI_MODEL")?.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, base_url, model))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

// Blank values count as unset.
fn read_var<F>(lookup: &F, key: &str) -> Result<Option<String>>
where
    F: Fn(&str) -> dotenvy::Result<String>,
{
    match lookup(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(dotenvy::Error::EnvVar(VarError::NotPresent)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}
