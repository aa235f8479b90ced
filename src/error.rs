//! Error types for tenthman operations.
//!
//! Defines the error types for the major subsystems:
//! - Remote LLM API interactions (transport, status, retry exhaustion)
//! - Debate orchestration (participant and judge failures, cancellation)
//! - Result persistence (JSON, markdown and log output)

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connect, DNS, timeout). Never retried.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    /// Non-retryable status returned by the remote API.
    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    /// Retryable statuses kept coming back until the retry budget ran out.
    #[error("API error ({code}) after {attempts} attempts: {message}")]
    RetriesExhausted {
        attempts: u32,
        code: u16,
        message: String,
    },

    #[error("Request cancelled")]
    Cancelled,
}

impl LlmError {
    /// Returns the HTTP status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } | Self::RetriesExhausted { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors that abort a debate run.
#[derive(Debug, Error)]
pub enum DebateError {
    /// A participant's turn could not be generated.
    #[error("agent {participant}: {source}")]
    Participant {
        participant: String,
        #[source]
        source: LlmError,
    },

    /// The consensus judge could not reach the remote model.
    #[error("{stage}: {source}")]
    Judge {
        stage: &'static str,
        #[source]
        source: LlmError,
    },

    #[error("debate cancelled")]
    Cancelled,
}

impl DebateError {
    /// Wraps a call-layer failure for the given participant, surfacing
    /// cancellation as its own variant.
    pub fn participant(name: impl Into<String>, source: LlmError) -> Self {
        match source {
            LlmError::Cancelled => Self::Cancelled,
            source => Self::Participant {
                participant: name.into(),
                source,
            },
        }
    }

    /// Wraps a judge failure for the given evaluation stage.
    pub fn judge(stage: &'static str, source: LlmError) -> Self {
        match source {
            LlmError::Cancelled => Self::Cancelled,
            source => Self::Judge { stage, source },
        }
    }

    /// Returns true if the run was aborted by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors that can occur while persisting debate results.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
