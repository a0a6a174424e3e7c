//! Progress events, fire-and-forget.
//!
//! Events are emitted at each stage boundary for any observer (CLI, UI
//! stream). Emission never blocks and never fails the job: a closed or
//! absent receiver is simply ignored.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Event kind at a stage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Start,
    Progress,
    Complete,
    Error,
}

/// One progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: ProgressKind,
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub percentage: u8,
    #[serde(rename = "currentStep")]
    pub current_step: String,
}

/// Handle for emitting progress events.
///
/// Cheap to clone; the default sender is disabled and drops everything.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSender {
    /// Create a sender/receiver pair.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender that drops all events.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Emit an event; errors (no receiver) are ignored.
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn start(&self, job_id: &str, step: impl Into<String>) {
        self.emit(ProgressEvent {
            kind: ProgressKind::Start,
            job_id: job_id.to_string(),
            percentage: 0,
            current_step: step.into(),
        });
    }

    pub fn progress(&self, job_id: &str, percentage: u8, step: impl Into<String>) {
        self.emit(ProgressEvent {
            kind: ProgressKind::Progress,
            job_id: job_id.to_string(),
            percentage: percentage.min(100),
            current_step: step.into(),
        });
    }

    pub fn complete(&self, job_id: &str, step: impl Into<String>) {
        self.emit(ProgressEvent {
            kind: ProgressKind::Complete,
            job_id: job_id.to_string(),
            percentage: 100,
            current_step: step.into(),
        });
    }

    pub fn error(&self, job_id: &str, step: impl Into<String>) {
        self.emit(ProgressEvent {
            kind: ProgressKind::Error,
            job_id: job_id.to_string(),
            percentage: 100,
            current_step: step.into(),
        });
    }
}
