//! Rename job orchestration.
//!
//! Wires the pipeline together: chunk → dispatch → merge → apply. Chunk
//! failures become warnings on the output, never silent drops; only
//! config-time and parse failures abort the job.

use crate::apply::apply_renames;
use crate::chunker::{divide_into_chunks, HeuristicCounter, TokenCounter};
use crate::config::{FormatOptions, JobConfig};
use crate::dispatch::{dispatch, CancelFlag};
use crate::error::Error;
use crate::events::ProgressSender;
use crate::merge::merge;
use crate::provider::{ProviderClient, ProviderRegistry, RenameSuggestion};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A recoverable, chunk-scoped failure recorded on the job output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobWarning {
    pub chunk_index: usize,
    pub message: String,
}

/// Counters for one completed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub chunk_count: usize,
    pub failed_chunks: usize,
    pub suggestion_count: usize,
    pub rename_count: usize,
    pub requests: u64,
    pub total_tokens: u64,
}

/// Result of a rename job.
#[derive(Debug)]
pub struct JobOutput {
    /// The rewritten source.
    pub code: String,
    /// Chunk-level failures; non-empty whenever any chunk was lost.
    pub warnings: Vec<JobWarning>,
    pub stats: JobStats,
    /// Style options passed through untouched for the downstream formatter.
    pub format: FormatOptions,
}

static JOB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One rename job: owns its provider registry, cancel flag, and progress
/// sender.
pub struct RenameJob {
    config: JobConfig,
    registry: ProviderRegistry,
    cancel: CancelFlag,
    progress: ProgressSender,
    job_id: String,
    /// Test seam: overrides registry-built providers when set.
    provider_override: Option<Arc<dyn ProviderClient>>,
}

impl RenameJob {
    #[must_use]
    pub fn new(config: JobConfig) -> Self {
        let job_id = format!("job-{}", JOB_COUNTER.fetch_add(1, Ordering::Relaxed));
        Self {
            config,
            registry: ProviderRegistry::new(),
            cancel: CancelFlag::new(),
            progress: ProgressSender::disabled(),
            job_id,
            provider_override: None,
        }
    }

    /// Attach a progress sender; events are fire-and-forget.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Use a pre-built provider instead of the registry (mock backends,
    /// embedding callers that manage their own clients).
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.provider_override = Some(provider);
        self
    }

    /// Handle for cancelling this job from another task.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Run the full pipeline over `source`.
    ///
    /// # Errors
    /// `Error::Config`/`Error::UnsupportedModel` before any dispatch;
    /// `Error::Parse` if the source cannot be parsed (no partial output).
    pub async fn run(&mut self, source: &str) -> Result<JobOutput, Error> {
        self.progress.start(&self.job_id, "starting rename job");
        match self.run_inner(source).await {
            Ok(output) => {
                self.progress.complete(&self.job_id, "rename complete");
                Ok(output)
            }
            Err(e) => {
                self.progress.error(&self.job_id, e.to_string());
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self, source: &str) -> Result<JobOutput, Error> {
        let limits = self.config.chunk_limits()?;
        let provider = match &self.provider_override {
            Some(provider) => Arc::clone(provider),
            None => self.registry.get_or_create(&self.config)?,
        };

        let counter: &dyn TokenCounter = &HeuristicCounter;
        let chunks = divide_into_chunks(source, &limits, counter);
        tracing::info!(
            job_id = %self.job_id,
            chunks = chunks.len(),
            backend = provider.name(),
            model = %self.config.model,
            "dispatching rename requests"
        );
        self.progress
            .progress(&self.job_id, 0, format!("dispatching {} chunks", chunks.len()));

        let outcomes = dispatch(
            Arc::clone(&provider),
            &chunks,
            &self.config.request_config(),
            &self.config.dispatch_options(),
            &self.cancel,
            &self.progress,
            &self.job_id,
        )
        .await;

        let mut warnings = Vec::new();
        let mut suggestion_lists: Vec<Vec<RenameSuggestion>> = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome.result {
                Ok(suggestions) => suggestion_lists.push(suggestions),
                Err(e) => {
                    let warning = JobWarning {
                        chunk_index: outcome.chunk_index,
                        message: format!("chunk {} failed: {e}", outcome.chunk_index),
                    };
                    tracing::warn!(job_id = %self.job_id, chunk = warning.chunk_index, "{}", warning.message);
                    warnings.push(warning);
                }
            }
        }

        let suggestion_count = suggestion_lists.iter().map(Vec::len).sum();
        let map = merge(&suggestion_lists);
        self.progress.progress(
            &self.job_id,
            100,
            format!("applying {} renames", map.len()),
        );

        let code = apply_renames(source, &map)?;
        let provider_stats = provider.stats();

        Ok(JobOutput {
            code,
            stats: JobStats {
                chunk_count: chunks.len(),
                failed_chunks: warnings.len(),
                suggestion_count,
                rename_count: map.len(),
                requests: provider_stats.requests,
                total_tokens: provider_stats.total_tokens,
            },
            warnings,
            format: self.config.format.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_unique() {
        let a = RenameJob::new(JobConfig::default());
        let b = RenameJob::new(JobConfig::default());
        assert_ne!(a.job_id(), b.job_id());
        assert!(a.job_id().starts_with("job-"));
    }

    #[tokio::test]
    async fn test_bad_config_aborts_before_dispatch() {
        let config = JobConfig::default().with_model("gpt-unreleased");
        let mut job = RenameJob::new(config);
        let err = job.run("var a = 1;").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel { .. }));
    }
}
