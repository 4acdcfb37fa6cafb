pub mod entry;
pub mod error;
pub mod ids;
pub mod journal;
pub mod payload;

pub use entry::{EntryKind, EntryPayload, OutcomeResult, ServiceTarget};
pub use error::{HandlerError, StatusCode};
pub use ids::{EntryIndex, InvocationId};
pub use journal::{JournalEntry, SessionOutcome};
pub use payload::Payload;
