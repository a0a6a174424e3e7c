//! Hosted OpenAI-compatible backend.

use super::{wire, ProviderClient, ProviderError, ProviderStats, RenameSuggestion, RequestConfig, UsageCounters};
use crate::error::Error;
use futures::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENVS: [&str; 2] = ["UNMANGLE_API_KEY", "OPENAI_API_KEY"];

/// Context windows for the hosted models we know how to budget for.
/// Longest prefix wins, so versioned model names match their family.
const MODEL_CONTEXT_WINDOWS: &[(&str, usize)] = &[
    ("gpt-4o-mini", 128_000),
    ("gpt-4o", 128_000),
    ("gpt-4-turbo", 128_000),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo", 16_385),
];

/// Look up the context window for a hosted model name.
///
/// Returns `None` for unknown models; the caller turns that into a fatal
/// config-time error rather than guessing a budget.
#[must_use]
pub fn context_window_for(model: &str) -> Option<usize> {
    MODEL_CONTEXT_WINDOWS
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|&(_, window)| window)
}

/// Client for a hosted OpenAI-compatible chat-completions API.
#[derive(Debug)]
pub struct OpenAiProvider {
    base_url: Url,
    http: Client,
    api_key: String,
    counters: UsageCounters,
}

impl OpenAiProvider {
    /// Create a provider against `base_url` with the given key.
    ///
    /// # Errors
    /// Returns `Error::Config` if the URL is invalid or the HTTP client
    /// cannot be created.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid provider base URL '{base_url}': {e}")))?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(concat!("unmangle/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http,
            api_key: api_key.to_string(),
            counters: UsageCounters::default(),
        })
    }
}

impl ProviderClient for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn suggest_renames<'a>(
        &'a self,
        code: &'a str,
        req: &'a RequestConfig,
    ) -> BoxFuture<'a, Result<Vec<RenameSuggestion>, ProviderError>> {
        Box::pin(async move {
            let url = self
                .base_url
                .join("chat/completions")
                .map_err(|e| ProviderError::Transient(format!("failed to build URL: {e}")))?;

            let payload = wire::build_chat_payload(code, req);
            let body = wire::post_chat(&self.http, url, Some(&self.api_key), &payload).await?;
            let (suggestions, tokens) = wire::parse_chat_response(&body)?;

            self.counters.record(tokens);
            tracing::debug!(
                suggestions = suggestions.len(),
                tokens,
                model = %req.model,
                "openai chunk response"
            );
            Ok(suggestions)
        })
    }

    fn stats(&self) -> ProviderStats {
        self.counters.snapshot()
    }
}
