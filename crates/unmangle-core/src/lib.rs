#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::return_self_not_must_use)]

pub mod apply;
pub mod chunker;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod job;
pub mod merge;
pub mod provider;
pub mod version;

pub use apply::apply_renames;
pub use chunker::{divide_into_chunks, ChunkLimits, CodeChunk, HeuristicCounter, TokenCounter};
pub use config::{FormatOptions, JobConfig, ProviderKind, QuoteStyle, TrailingComma};
pub use dispatch::{dispatch, CancelFlag, ChunkOutcome, DispatchOptions};
pub use error::Error;
pub use events::{ProgressEvent, ProgressKind, ProgressSender};
pub use job::{JobOutput, JobStats, JobWarning, RenameJob};
pub use merge::{merge, RenameMap};
pub use provider::{
    ProviderClient, ProviderError, ProviderStats, RenameSuggestion, RequestConfig, RetryPolicy,
    SuggestionKind,
};
pub use version::VERSION;
