use durable_types::{EntryIndex, JournalEntry};

/// The replay prefix received at `Start`: entries at positions
/// `1..known_entries-1` (position 0, the input entry, is tracked separately
/// by the Machine). Matching against it is purely positional (§4.4) — unlike
/// the teacher's promise-id-keyed cache, there is no out-of-order lookup.
#[derive(Clone, Debug, Default)]
pub struct ReplayPrefix {
    entries: Vec<JournalEntry>,
}

impl ReplayPrefix {
    pub fn build(entries: Vec<JournalEntry>) -> Self {
        Self { entries }
    }

    /// The entry recorded at `index`, if the prefix extends that far.
    pub fn entry_at(&self, index: EntryIndex) -> Option<&JournalEntry> {
        self.entries.get(index.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
