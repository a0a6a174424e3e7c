//! LLM provider clients.
//!
//! Every backend implements the same [`ProviderClient`] contract, so the
//! dispatcher and merger never branch on backend identity. Heterogeneous
//! wire shapes are normalized here, at the boundary, into
//! [`RenameSuggestion`] values.

pub mod local;
pub mod openai;
pub mod registry;
pub mod retry;
pub mod wire;

pub use local::LocalProvider;
pub use openai::OpenAiProvider;
pub use registry::ProviderRegistry;
pub use retry::with_retry;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// What sort of binding a suggestion renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Variable,
    Function,
    Class,
    Method,
    Property,
}

impl SuggestionKind {
    /// Map a free-form label from a model response onto the closed set.
    /// Anything unrecognized becomes `Variable`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "function" | "func" | "fn" => Self::Function,
            "class" => Self::Class,
            "method" => Self::Method,
            "property" | "prop" | "field" => Self::Property,
            _ => Self::Variable,
        }
    }
}

/// A proposed identifier rename for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameSuggestion {
    #[serde(rename = "originalName")]
    pub original_name: String,
    #[serde(rename = "suggestedName")]
    pub suggested_name: String,
    /// Model-reported confidence, clamped to `[0, 1]` at the boundary.
    pub confidence: f64,
    pub kind: SuggestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl RenameSuggestion {
    /// Create a suggestion with clamped confidence.
    #[must_use]
    pub fn new(
        original_name: impl Into<String>,
        suggested_name: impl Into<String>,
        confidence: f64,
        kind: SuggestionKind,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            suggested_name: suggested_name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            kind,
            reasoning: None,
        }
    }
}

/// Model parameters sent with every chunk request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    pub model: String,
    pub temperature: f64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.2,
        }
    }
}

/// Provider failure classes.
///
/// Only `RateLimit` and `Transient` are retried; `Auth` and
/// `UnsupportedModel` are fatal, and `MalformedResponse` fails just the
/// chunk that produced it.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("AUTH_FAILED: {0}")]
    Auth(String),

    #[error("RATE_LIMITED: {0}")]
    RateLimit(String),

    #[error("TRANSIENT: {0}")]
    Transient(String),

    #[error("MALFORMED_RESPONSE: {0}")]
    MalformedResponse(String),

    #[error("MODEL_UNSUPPORTED: {0}")]
    UnsupportedModel(String),

    #[error("CANCELLED: {0}")]
    Cancelled(String),
}

impl ProviderError {
    /// Whether the retry loop may attempt this call again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit(_) | Self::Transient(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Transient(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::Transient(format!("connection failed: {e}"))
        } else if e.is_decode() {
            Self::MalformedResponse(format!("invalid response body: {e}"))
        } else {
            Self::Transient(e.to_string())
        }
    }
}

/// Exponential backoff parameters for retryable failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before re-attempting after failed attempt number `attempt`
    /// (zero-based): `base_delay × multiplier^attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .mul_f64(self.backoff_multiplier.powi(attempt as i32))
    }
}

/// Per-provider usage snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub requests: u64,
    pub total_tokens: u64,
}

/// Atomic request/token counters, one set per provider instance.
///
/// Updated at call completion. Atomics because the tokio multi-thread
/// runtime may drive completions from different worker threads.
#[derive(Debug, Default)]
pub(crate) struct UsageCounters {
    requests: AtomicU64,
    tokens: AtomicU64,
}

impl UsageCounters {
    pub(crate) fn record(&self, tokens: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.tokens.fetch_add(tokens, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ProviderStats {
        ProviderStats {
            requests: self.requests.load(Ordering::Relaxed),
            total_tokens: self.tokens.load(Ordering::Relaxed),
        }
    }
}

/// Uniform contract every LLM backend implements.
///
/// Implementations validate and normalize every returned suggestion:
/// entries with empty names are dropped, confidence is clamped to `[0, 1]`,
/// and kind labels are mapped onto [`SuggestionKind`].
pub trait ProviderClient: Send + Sync {
    /// Backend name (e.g. "openai", "local").
    fn name(&self) -> &'static str;

    /// Request rename suggestions for one chunk of code.
    fn suggest_renames<'a>(
        &'a self,
        code: &'a str,
        req: &'a RequestConfig,
    ) -> BoxFuture<'a, Result<Vec<RenameSuggestion>, ProviderError>>;

    /// Snapshot of this instance's request/token counters.
    fn stats(&self) -> ProviderStats;
}
