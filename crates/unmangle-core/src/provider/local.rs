//! Local OpenAI-compatible backend (llama.cpp server, Ollama, etc.).
//!
//! Same wire format as the hosted backend, no authentication, and the
//! caller supplies the context window since no model table can exist for
//! arbitrary local models.

use super::{wire, ProviderClient, ProviderError, ProviderStats, RenameSuggestion, RequestConfig, UsageCounters};
use crate::error::Error;
use futures::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Default base URL (Ollama's OpenAI-compatible endpoint).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434/v1/";

/// Client for a local OpenAI-compatible chat server.
#[derive(Debug)]
pub struct LocalProvider {
    base_url: Url,
    http: Client,
    counters: UsageCounters,
}

impl LocalProvider {
    /// Create a provider against a local server.
    ///
    /// # Errors
    /// Returns `Error::Config` if the URL is invalid or the HTTP client
    /// cannot be created.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
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
            counters: UsageCounters::default(),
        })
    }
}

impl ProviderClient for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
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
            let body = wire::post_chat(&self.http, url, None, &payload).await?;
            let (suggestions, tokens) = wire::parse_chat_response(&body)?;

            self.counters.record(tokens);
            tracing::debug!(
                suggestions = suggestions.len(),
                tokens,
                model = %req.model,
                "local chunk response"
            );
            Ok(suggestions)
        })
    }

    fn stats(&self) -> ProviderStats {
        self.counters.snapshot()
    }
}
