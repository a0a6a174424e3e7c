//! Job-level error types.
//!
//! Chunk-level failures never surface here: they are downgraded to
//! [`crate::job::JobWarning`]s so a partially failed job can still emit
//! best-effort output. Only errors that make the whole job unsafe or
//! impossible (bad configuration, unsupported model, unparseable source)
//! abort the run.

use thiserror::Error;

/// Fatal error for a rename job.
#[derive(Error, Debug)]
pub enum Error {
    #[error("CONFIG_INVALID: {0}")]
    Config(String),

    #[error("MODEL_UNSUPPORTED: model '{model}' is not supported by the '{provider}' provider")]
    UnsupportedModel { provider: &'static str, model: String },

    #[error("PARSE_FAILED: {message}")]
    Parse { message: String },

    #[error("EMIT_FAILED: {0}")]
    Emit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_code() {
        let err = Error::config("unknown provider 'foo'");
        assert!(err.to_string().contains("CONFIG_INVALID"));
        assert!(err.to_string().contains("foo"));

        let err = Error::UnsupportedModel {
            provider: "openai",
            model: "gpt-0".to_string(),
        };
        assert!(err.to_string().contains("MODEL_UNSUPPORTED"));
        assert!(err.to_string().contains("gpt-0"));
    }
}
