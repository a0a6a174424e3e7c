//! Job configuration.

use crate::chunker::ChunkLimits;
use crate::dispatch::DispatchOptions;
use crate::error::Error;
use crate::provider::{openai, RequestConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Which LLM backend serves the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Local,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Local => "local",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "local" => Ok(Self::Local),
            other => Err(Error::config(format!(
                "unknown provider '{other}' (expected 'openai' or 'local')"
            ))),
        }
    }
}

/// Quote style passed through to the downstream formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    Single,
    #[default]
    Double,
}

/// Trailing-comma policy passed through to the downstream formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrailingComma {
    None,
    #[default]
    Es5,
    All,
}

/// Style options carried through to the formatting stage untouched.
/// Nothing in this crate interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub print_width: usize,
    pub quote_style: QuoteStyle,
    pub tab_width: usize,
    pub trailing_comma: TrailingComma,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            print_width: 80,
            quote_style: QuoteStyle::default(),
            tab_width: 2,
            trailing_comma: TrailingComma::default(),
        }
    }
}

/// Configuration for one rename job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub provider: ProviderKind,
    pub model: String,
    /// Override the provider's default endpoint.
    pub base_url: Option<String>,
    /// Explicit API key; falls back to the environment when absent.
    pub api_key: Option<String>,
    /// Required for the local provider; optional override for hosted ones.
    pub context_window: Option<usize>,
    /// Soft chunk threshold as a fraction of the context window.
    pub soft_fraction: f64,
    /// Hard chunk threshold as a fraction of the context window.
    pub hard_fraction: f64,
    pub overlap_ratio: f64,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub call_timeout: Duration,
    pub temperature: f64,
    pub format: FormatOptions,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            context_window: None,
            soft_fraction: 0.25,
            hard_fraction: 0.35,
            overlap_ratio: 0.2,
            concurrency: 6,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(120),
            temperature: 0.2,
            format: FormatOptions::default(),
        }
    }
}

impl JobConfig {
    /// Set the provider kind.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the endpoint base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the model context window.
    #[must_use]
    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = Some(context_window);
        self
    }

    /// Set the dispatcher concurrency bound.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Cache key for the provider registry: everything that changes which
    /// client instance must serve the job.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}",
            self.provider.as_str(),
            self.model,
            self.base_url.as_deref().unwrap_or("-")
        )
    }

    /// Resolve the model context window, validating it per provider.
    ///
    /// # Errors
    /// `Error::UnsupportedModel` for a hosted model missing from the known
    /// table; `Error::Config` when the local provider has no explicit
    /// window.
    pub fn resolved_context_window(&self) -> Result<usize, Error> {
        if let Some(window) = self.context_window {
            if window < 16 {
                return Err(Error::config(format!(
                    "context window {window} is too small to chunk against"
                )));
            }
            return Ok(window);
        }
        match self.provider {
            ProviderKind::OpenAi => {
                openai::context_window_for(&self.model).ok_or_else(|| Error::UnsupportedModel {
                    provider: "openai",
                    model: self.model.clone(),
                })
            }
            ProviderKind::Local => Err(Error::config(
                "local provider requires an explicit context window (set context_window)",
            )),
        }
    }

    /// Derive chunking limits from the resolved context window.
    pub fn chunk_limits(&self) -> Result<ChunkLimits, Error> {
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(Error::config(format!(
                "overlap ratio {} must be in [0, 1)",
                self.overlap_ratio
            )));
        }
        if self.soft_fraction <= 0.0 || self.hard_fraction <= self.soft_fraction {
            return Err(Error::config(format!(
                "chunk fractions must satisfy 0 < soft ({}) < hard ({})",
                self.soft_fraction, self.hard_fraction
            )));
        }
        let window = self.resolved_context_window()?;
        Ok(ChunkLimits::from_context_window(
            window,
            self.soft_fraction,
            self.hard_fraction,
            self.overlap_ratio,
        ))
    }

    /// Per-request model parameters.
    #[must_use]
    pub fn request_config(&self) -> RequestConfig {
        RequestConfig {
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }

    /// Dispatcher options derived from this config.
    #[must_use]
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            concurrency: self.concurrency,
            call_timeout: self.call_timeout,
            retry: self.retry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" LOCAL ".parse::<ProviderKind>().unwrap(), ProviderKind::Local);
        assert!("gemini".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_fingerprint_discriminates() {
        let a = JobConfig::default();
        let b = JobConfig::default().with_model("gpt-4o");
        let c = JobConfig::default().with_base_url("https://proxy.example/v1/");
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint(), JobConfig::default().fingerprint());
    }

    #[test]
    fn test_unknown_hosted_model_is_unsupported() {
        let config = JobConfig::default().with_model("gpt-unreleased");
        assert!(matches!(
            config.resolved_context_window(),
            Err(Error::UnsupportedModel { .. })
        ));
    }

    #[test]
    fn test_local_requires_context_window() {
        let config = JobConfig::default()
            .with_provider(ProviderKind::Local)
            .with_model("llama3");
        assert!(matches!(config.resolved_context_window(), Err(Error::Config(_))));

        let config = config.with_context_window(8192);
        assert_eq!(config.resolved_context_window().unwrap(), 8192);
    }

    #[test]
    fn test_chunk_limits_derived() {
        let config = JobConfig::default().with_context_window(1000);
        let limits = config.chunk_limits().unwrap();
        assert_eq!(limits.soft_tokens, 250);
        assert_eq!(limits.hard_tokens, 350);
        assert!((limits.overlap_ratio - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_fractions_rejected() {
        let mut config = JobConfig::default().with_context_window(1000);
        config.soft_fraction = 0.5;
        config.hard_fraction = 0.4;
        assert!(config.chunk_limits().is_err());

        let mut config = JobConfig::default().with_context_window(1000);
        config.overlap_ratio = 1.0;
        assert!(config.chunk_limits().is_err());
    }
}
