use durable_types::EntryIndex;

/// Describes a specific journal invariant violation (SPEC_FULL.md §3 Invariants).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalViolation {
    /// Invariant 1: journal positions are consumed strictly monotonically.
    NonMonotonicPosition {
        expected: EntryIndex,
        actual: EntryIndex,
    },
    /// Invariant 2: the kind the handler issues at position i must match
    /// the kind recorded in the replay prefix at position i.
    KindMismatch {
        index: EntryIndex,
        expected: &'static str,
        actual: &'static str,
    },
    /// Invariant 4: a second session-terminal message (Output/Suspension/
    /// Error) was about to be written after one was already emitted.
    MultipleSessionOutcomes {
        first: &'static str,
        second: &'static str,
    },
    /// The first frame of a session was not `Start`.
    UnexpectedMessage { expected: &'static str, actual: &'static str },
    /// The `Start` frame's protocol version is not supported.
    UnsupportedVersion { got: u16, supported: u16 },
}

impl std::fmt::Display for JournalViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonMonotonicPosition { expected, actual } => write!(
                f,
                "non-monotonic journal position: expected {expected}, got {actual}"
            ),
            Self::KindMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "journal mismatch at position {index}: handler issued {actual}, journal recorded {expected}"
            ),
            Self::MultipleSessionOutcomes { first, second } => write!(
                f,
                "session already emitted {first}, cannot also emit {second}"
            ),
            Self::UnexpectedMessage { expected, actual } => {
                write!(f, "expected {expected} message, got {actual}")
            }
            Self::UnsupportedVersion { got, supported } => write!(
                f,
                "unsupported protocol version {got}, expected {supported}"
            ),
        }
    }
}

/// Errors produced by journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal is empty")]
    EmptyJournal,
    #[error("invariant violation: {0}")]
    InvariantViolation(JournalViolation),
}
