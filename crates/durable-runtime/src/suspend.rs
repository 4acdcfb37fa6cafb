use durable_types::EntryIndex;

/// Stands in for the source's stack-unwinding suspension signal
/// (SPEC_FULL.md §9 Design Notes). Every [`crate::context::Context`] method
/// returns `Result<_, Suspended>` internally and propagates it with `?`;
/// Rust's ownership model means no frame is ever resumed after one escapes,
/// which is the property a thrown exception buys in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Suspended(pub EntryIndex);
