//! Provider registry: an explicit client cache owned by the job.
//!
//! Clients are cached by config fingerprint so repeated runs against the
//! same backend reuse one HTTP client and keep cumulative usage counters.
//! Deliberately an owned object, not a process-wide singleton.

use super::{local, openai, LocalProvider, OpenAiProvider, ProviderClient};
use crate::config::{JobConfig, ProviderKind};
use crate::error::Error;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache of constructed provider clients, keyed by config fingerprint.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the client for `config`, constructing and caching it on first use.
    ///
    /// # Errors
    /// `Error::Config` for a missing API key or bad endpoint;
    /// `Error::UnsupportedModel` for an unknown hosted model.
    pub fn get_or_create(&mut self, config: &JobConfig) -> Result<Arc<dyn ProviderClient>, Error> {
        let key = config.fingerprint();
        if let Some(provider) = self.providers.get(&key) {
            return Ok(Arc::clone(provider));
        }

        let provider = build_provider(config)?;
        tracing::debug!(fingerprint = %key, backend = provider.name(), "constructed provider client");
        self.providers.insert(key, Arc::clone(&provider));
        Ok(provider)
    }

    /// Number of cached clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn build_provider(config: &JobConfig) -> Result<Arc<dyn ProviderClient>, Error> {
    // Validates the model/context-window pairing up front so a bad model
    // name fails at config time, not mid-dispatch.
    config.resolved_context_window()?;

    match config.provider {
        ProviderKind::OpenAi => {
            let api_key = resolve_api_key(config)?;
            let base_url = config.base_url.as_deref().unwrap_or(openai::DEFAULT_BASE_URL);
            let provider = OpenAiProvider::new(base_url, &api_key, config.call_timeout)?;
            Ok(Arc::new(provider))
        }
        ProviderKind::Local => {
            let base_url = config.base_url.as_deref().unwrap_or(local::DEFAULT_BASE_URL);
            let provider = LocalProvider::new(base_url, config.call_timeout)?;
            Ok(Arc::new(provider))
        }
    }
}

fn resolve_api_key(config: &JobConfig) -> Result<String, Error> {
    if let Some(key) = &config.api_key {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }
    for env in openai::API_KEY_ENVS {
        if let Ok(key) = std::env::var(env) {
            if !key.is_empty() {
                return Ok(key);
            }
        }
    }
    Err(Error::config(format!(
        "no API key for the openai provider: set {} or {}, or pass api_key in the job config",
        openai::API_KEY_ENVS[0],
        openai::API_KEY_ENVS[1]
    )))
}
