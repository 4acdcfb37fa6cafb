use durable_journal::JournalError;
use thiserror::Error;

/// Fatal errors that end an invocation session without a clean Output or
/// Suspension. All are reported as non-terminal INTERNAL to the orchestrator
/// (SPEC_FULL.md §7): the handler never observes them.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("frame decode failed: {0}")]
    DecodeFailed(String),
    #[error("connection closed mid-frame")]
    UnexpectedEof,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl RuntimeError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailed(message.into())
    }
}
