//! Error types for the `helpdesk-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing, answering, or reconciling feedback.
///
/// Guardrail rejections and "no match" are not errors; they are variants of
/// [`Answer`](crate::engine::Answer).
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding capability failed to embed a catalogue entry or query.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The issue catalogue could not be loaded or is inconsistent.
    #[error("Catalogue error: {0}")]
    CatalogueError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Feedback referenced a candidate that is not the target record's top result.
    #[error("Malformed feedback: expected candidate '{expected}', got '{received}'")]
    MalformedFeedback {
        /// The top retrieved id of the targeted record.
        expected: String,
        /// The candidate id carried by the feedback action.
        received: String,
    },

    /// The targeted record already received its feedback.
    #[error("Feedback already applied to the targeted query")]
    FeedbackAlreadyApplied,

    /// No ledger record carries the given correlation token.
    #[error("Unknown query token: {0}")]
    UnknownQueryToken(String),

    /// A feedback action payload could not be parsed.
    #[error("Invalid feedback action: {0}")]
    InvalidFeedbackAction(String),

    /// A chat command the assistant does not know.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Appending to the durable feedback log failed.
    #[error("Feedback log error: {0}")]
    FeedbackLogError(#[from] std::io::Error),
}

impl RagError {
    /// Whether this error is a best-effort feedback problem that callers log and ignore.
    pub fn is_ignorable_feedback(&self) -> bool {
        matches!(
            self,
            RagError::MalformedFeedback { .. }
                | RagError::FeedbackAlreadyApplied
                | RagError::UnknownQueryToken(_)
        )
    }
}

/// A convenience result type for helpdesk retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
