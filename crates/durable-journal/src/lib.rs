pub mod error;
pub mod invariants;
pub mod replay;
pub mod state_cache;

pub use error::{JournalError, JournalViolation};
pub use invariants::{SessionOutcomeGuard, check_kind_match, check_position};
pub use replay::ReplayPrefix;
pub use state_cache::{StateCache, StateLookup};
