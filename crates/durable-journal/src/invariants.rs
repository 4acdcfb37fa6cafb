use durable_types::EntryIndex;

use crate::error::JournalViolation;

/// Invariant 1: the handler must consume journal positions strictly in
/// order. Mirrors `invariant-journal::invariants::structural`'s S-1
/// (sequence numbers must equal their array index).
pub fn check_position(expected: EntryIndex, actual: EntryIndex) -> Result<(), JournalViolation> {
    if expected != actual {
        return Err(JournalViolation::NonMonotonicPosition { expected, actual });
    }
    Ok(())
}

/// Invariant 2: the kind the handler issues at position i must equal the
/// kind recorded in the replay prefix at position i. `expected` is the
/// journal-recorded kind, `actual` is the kind the handler just issued.
pub fn check_kind_match(
    index: EntryIndex,
    expected: &'static str,
    actual: &'static str,
) -> Result<(), JournalViolation> {
    if expected != actual {
        return Err(JournalViolation::KindMismatch {
            index,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Tracks Invariant 4 ("exactly one of {Output+End, Suspension, Error} per
/// session") incrementally, the same append-time-check idiom as
/// `invariant-journal::invariants::structural`'s S-3/S-4 terminal checks.
#[derive(Debug, Default)]
pub struct SessionOutcomeGuard {
    emitted: Option<&'static str>,
}

impl SessionOutcomeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call before writing a session-terminal message (`Output`+`End`,
    /// `Suspension`, or `Error`). Fails if one was already emitted.
    pub fn check_emit(&mut self, outcome: &'static str) -> Result<(), JournalViolation> {
        if let Some(first) = self.emitted {
            return Err(JournalViolation::MultipleSessionOutcomes {
                first,
                second: outcome,
            });
        }
        self.emitted = Some(outcome);
        Ok(())
    }

    pub fn emitted(&self) -> Option<&'static str> {
        self.emitted
    }
}
