use crate::entry::EntryPayload;
use crate::ids::EntryIndex;

/// A single entry in the replay prefix.
///
/// `completed` only carries meaning for blocking kinds (see
/// `EntryKind::is_blocking`): it distinguishes an entry whose result is
/// already recorded from one still pending completion by the orchestrator.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JournalEntry {
    pub index: EntryIndex,
    pub payload: EntryPayload,
    pub completed: bool,
}

impl JournalEntry {
    pub fn new(index: EntryIndex, payload: EntryPayload, completed: bool) -> Self {
        Self {
            index,
            payload,
            completed,
        }
    }
}

/// The invocation's observable outcome once its session ends.
///
/// Exactly one of these is ever produced by a single session (Invariant 4);
/// `Pending` covers the in-progress state while the handler is still running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Pending,
    Output,
    Suspension,
    Error,
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Output => write!(f, "Output"),
            Self::Suspension => write!(f, "Suspension"),
            Self::Error => write!(f, "Error"),
        }
    }
}
