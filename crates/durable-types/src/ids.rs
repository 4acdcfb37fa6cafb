use std::fmt;

/// Opaque per-invocation identifier, used only for logs and diagnostics.
///
/// Unlike a hierarchical promise id, this carries no derivation semantics:
/// the orchestrator assigns it and the core treats it as an inert label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct InvocationId(String);

impl InvocationId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a journal entry within an invocation's journal, 0-indexed.
///
/// Position 0 is always the input entry (`PollInput`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct EntryIndex(pub u32);

impl EntryIndex {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for EntryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EntryIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
