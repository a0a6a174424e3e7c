//! Concurrent chunk dispatch.
//!
//! Fans chunk requests out to the provider under a concurrency bound,
//! collecting exactly one outcome per chunk. One chunk's failure never
//! cancels its siblings: dispatch has partial-success semantics, and the
//! merger simply works with whatever succeeded.

use crate::chunker::CodeChunk;
use crate::events::ProgressSender;
use crate::provider::{retry, ProviderClient, ProviderError, RenameSuggestion, RequestConfig, RetryPolicy};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Maximum in-flight provider calls.
    pub concurrency: usize,
    /// Deadline per provider call; a timeout is a transient failure for
    /// that chunk only.
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 6,
            call_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

/// Exactly one of these per dispatched chunk.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub chunk_index: usize,
    pub result: Result<Vec<RenameSuggestion>, ProviderError>,
}

/// Cooperative cancellation flag, checked before each new request is
/// issued. In-flight calls are dropped with their futures.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run `suggest_renames` for every chunk under the concurrency bound.
///
/// Returns one outcome per chunk, sorted by chunk index so downstream
/// merging is deterministic regardless of completion order. Retries are
/// applied per chunk to retryable failures only; exhausted retries become
/// an error outcome for that chunk.
pub async fn dispatch(
    provider: Arc<dyn ProviderClient>,
    chunks: &[CodeChunk],
    req: &RequestConfig,
    opts: &DispatchOptions,
    cancel: &CancelFlag,
    progress: &ProgressSender,
    job_id: &str,
) -> Vec<ChunkOutcome> {
    let total = chunks.len();
    if total == 0 {
        return Vec::new();
    }
    let completed = AtomicUsize::new(0);

    let mut outcomes: Vec<ChunkOutcome> = stream::iter(chunks)
        .map(|chunk| {
            let provider = Arc::clone(&provider);
            let completed = &completed;
            async move {
                let result = if cancel.is_cancelled() {
                    Err(ProviderError::Cancelled(format!(
                        "chunk {} not issued: job cancelled",
                        chunk.index
                    )))
                } else {
                    let provider = &provider;
                    let text = chunk.text.as_str();
                    let chunk_index = chunk.index;
                    let call_timeout = opts.call_timeout;
                    retry::with_retry(&opts.retry, move || async move {
                        match tokio::time::timeout(
                            call_timeout,
                            provider.suggest_renames(text, req),
                        )
                        .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(ProviderError::Transient(format!(
                                "chunk {chunk_index} call exceeded {call_timeout:?}"
                            ))),
                        }
                    })
                    .await
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress.progress(
                    job_id,
                    (done * 100 / total) as u8,
                    format!("chunk {done}/{total}"),
                );

                if let Err(e) = &result {
                    tracing::warn!(chunk = chunk.index, error = %e, "chunk request failed");
                }
                ChunkOutcome {
                    chunk_index: chunk.index,
                    result,
                }
            }
        })
        .buffer_unordered(opts.concurrency.max(1))
        .collect()
        .await;

    outcomes.sort_by_key(|o| o.chunk_index);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderStats, SuggestionKind};
    use futures::future::BoxFuture;

    /// Provider that tracks in-flight concurrency and fails on request.
    struct TrackingProvider {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_marker: Option<String>,
        delay: Duration,
    }

    impl TrackingProvider {
        fn new(delay: Duration, fail_marker: Option<String>) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_marker,
                delay,
            }
        }
    }

    impl ProviderClient for TrackingProvider {
        fn name(&self) -> &'static str {
            "tracking"
        }

        fn suggest_renames<'a>(
            &'a self,
            code: &'a str,
            _req: &'a RequestConfig,
        ) -> BoxFuture<'a, Result<Vec<RenameSuggestion>, ProviderError>> {
            Box::pin(async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                if let Some(marker) = &self.fail_marker {
                    if code.contains(marker.as_str()) {
                        return Err(ProviderError::Transient("scripted failure".to_string()));
                    }
                }
                Ok(vec![RenameSuggestion::new(
                    "a",
                    "alpha",
                    0.9,
                    SuggestionKind::Variable,
                )])
            })
        }

        fn stats(&self) -> ProviderStats {
            ProviderStats::default()
        }
    }

    fn chunks(n: usize) -> Vec<CodeChunk> {
        (0..n)
            .map(|i| CodeChunk {
                index: i,
                text: format!("var x{i} = {i};"),
                start: i * 10,
                end: i * 10 + 10,
            })
            .collect()
    }

    fn fast_opts(concurrency: usize) -> DispatchOptions {
        DispatchOptions {
            concurrency,
            call_timeout: Duration::from_secs(5),
            retry: RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
                backoff_multiplier: 1.0,
            },
        }
    }

    #[tokio::test]
    async fn test_concurrency_bound_respected() {
        let provider = Arc::new(TrackingProvider::new(Duration::from_millis(25), None));
        let chunks = chunks(5);

        let outcomes = dispatch(
            Arc::clone(&provider) as Arc<dyn ProviderClient>,
            &chunks,
            &RequestConfig::default(),
            &fast_opts(2),
            &CancelFlag::new(),
            &ProgressSender::disabled(),
            "job-test",
        )
        .await;

        assert_eq!(outcomes.len(), 5);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);

        // Exactly one outcome per chunk, sorted.
        let indices: Vec<usize> = outcomes.iter().map(|o| o.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_siblings() {
        let provider = Arc::new(TrackingProvider::new(
            Duration::from_millis(1),
            Some("x2".to_string()),
        ));
        let chunks = chunks(4);

        let outcomes = dispatch(
            provider as Arc<dyn ProviderClient>,
            &chunks,
            &RequestConfig::default(),
            &fast_opts(4),
            &CancelFlag::new(),
            &ProgressSender::disabled(),
            "job-test",
        )
        .await;

        let failures: Vec<usize> = outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.chunk_index)
            .collect();
        assert_eq!(failures, vec![2]);
        assert_eq!(outcomes.iter().filter(|o| o.result.is_ok()).count(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_chunks_not_issued() {
        let provider = Arc::new(TrackingProvider::new(Duration::from_millis(1), None));
        let chunks = chunks(3);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcomes = dispatch(
            provider as Arc<dyn ProviderClient>,
            &chunks,
            &RequestConfig::default(),
            &fast_opts(2),
            &cancel,
            &ProgressSender::disabled(),
            "job-test",
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.result, Err(ProviderError::Cancelled(_)))));
    }

    #[tokio::test]
    async fn test_progress_reaches_hundred() {
        let provider = Arc::new(TrackingProvider::new(Duration::from_millis(1), None));
        let chunks = chunks(4);
        let (progress, mut rx) = ProgressSender::channel();

        dispatch(
            provider as Arc<dyn ProviderClient>,
            &chunks,
            &RequestConfig::default(),
            &fast_opts(2),
            &CancelFlag::new(),
            &progress,
            "job-test",
        )
        .await;
        drop(progress);

        let mut last = 0;
        while let Some(event) = rx.recv().await {
            last = event.percentage;
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn test_empty_chunk_list() {
        let provider = Arc::new(TrackingProvider::new(Duration::from_millis(1), None));
        let outcomes = dispatch(
            provider as Arc<dyn ProviderClient>,
            &[],
            &RequestConfig::default(),
            &fast_opts(2),
            &CancelFlag::new(),
            &ProgressSender::disabled(),
            "job-test",
        )
        .await;
        assert!(outcomes.is_empty());
    }
}
