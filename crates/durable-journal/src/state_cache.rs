use std::collections::HashMap;

use durable_types::Payload;

/// The result of looking a key up in the [`StateCache`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateLookup {
    /// The cache authoritatively knows the key's value (`Some`) or that the
    /// key is absent (`None`).
    Known(Option<Payload>),
    /// The cache is `partial` and has no entry for this key: it may still
    /// exist remotely and must be fetched via a `GetState` entry.
    Unknown,
}

/// The subset of user state the orchestrator shipped at `Start`.
///
/// Construction is a single O(n) scan over the `Start` payload's state
/// entries, mirroring `invariant-journal::replay::ReplayCache::build`.
#[derive(Clone, Debug, Default)]
pub struct StateCache {
    /// `Some(value)` = known value; `None` = explicitly known-absent
    /// (either from a complete `Start` snapshot or a local `clear`).
    /// A key missing from this map under `partial=true` is `Unknown`.
    entries: HashMap<Vec<u8>, Option<Payload>>,
    partial: bool,
}

impl StateCache {
    pub fn build(entries: Vec<(Vec<u8>, Vec<u8>)>, partial: bool) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k, Some(Payload::new(v))))
            .collect();
        Self { entries, partial }
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn get(&self, key: &[u8]) -> StateLookup {
        match self.entries.get(key) {
            Some(value) => StateLookup::Known(value.clone()),
            None if self.partial => StateLookup::Unknown,
            None => StateLookup::Known(None),
        }
    }

    pub fn set(&mut self, key: Vec<u8>, value: Payload) {
        self.entries.insert(key, Some(value));
    }

    pub fn clear(&mut self, key: &[u8]) {
        self.entries.insert(key.to_vec(), None);
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.partial = false;
    }

    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|_| k.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
