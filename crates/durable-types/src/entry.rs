use crate::error::StatusCode;
use crate::payload::Payload;

/// The kind of a journal entry. The wire's 16-bit message type tag maps
/// 1:1 onto this enum (see `durable_runtime::codec`).
///
/// Each kind has a defined replay decoder and new-entry producer (see the
/// journaled-operations table); `Start` and `PollInput` are handshake/input
/// framing rather than handler-issued operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntryKind {
    Start,
    PollInput,
    Output,
    End,
    Error,
    Suspension,
    GetState,
    SetState,
    ClearState,
    ClearAllState,
    GetStateKeys,
    Sleep,
    InvokeService,
    BackgroundInvoke,
    SideEffect,
    Awakeable,
    CompleteAwakeable,
}

impl EntryKind {
    /// Returns the variant name as a static string for error messages and logging.
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::PollInput => "PollInput",
            Self::Output => "Output",
            Self::End => "End",
            Self::Error => "Error",
            Self::Suspension => "Suspension",
            Self::GetState => "GetState",
            Self::SetState => "SetState",
            Self::ClearState => "ClearState",
            Self::ClearAllState => "ClearAllState",
            Self::GetStateKeys => "GetStateKeys",
            Self::Sleep => "Sleep",
            Self::InvokeService => "InvokeService",
            Self::BackgroundInvoke => "BackgroundInvoke",
            Self::SideEffect => "SideEffect",
            Self::Awakeable => "Awakeable",
            Self::CompleteAwakeable => "CompleteAwakeable",
        }
    }

    /// Whether this kind completes the invocation session (exactly one of
    /// these, or `Suspension`, may be written per session; see Invariant 4).
    pub fn is_session_terminal(self) -> bool {
        matches!(self, Self::End | Self::Suspension | Self::Error)
    }

    /// Whether the handler blocks awaiting a completion for this kind.
    /// `GetState` is "maybe": blocking only when the state cache is partial
    /// and the key is absent.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            Self::GetState
                | Self::GetStateKeys
                | Self::Sleep
                | Self::InvokeService
                | Self::SideEffect
        )
    }
}

/// A result oneof shared by `Output`, `InvokeService` completions and
/// `SideEffect` completions: either a success payload or a handler failure.
///
/// `terminal` carries the same classification as `HandlerError::terminal`
/// through the wire: for an `Output`'s own `Failure` it is always `true` (the
/// invocation already ended); for a `SideEffect`/`InvokeService` completion it
/// records whether the originating failure should end the invocation or
/// surface to the handler as a retriable `Err` once decoded back.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum OutcomeResult {
    Success(Payload),
    Failure {
        code: StatusCode,
        message: String,
        terminal: bool,
    },
}

/// The target of an `InvokeService`/`BackgroundInvoke` entry.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServiceTarget {
    pub service: String,
    pub handler: String,
    pub key: Option<String>,
}

/// The decoded payload carried by a [`crate::journal::JournalEntry`], keyed
/// by its [`EntryKind`]. Field shapes mirror the wire payloads in §6.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum EntryPayload {
    Start {
        protocol_version: u16,
        debug_id: String,
        known_entries: u32,
        state: Vec<(Vec<u8>, Vec<u8>)>,
        partial: bool,
    },
    PollInput {
        argument: Payload,
    },
    Output {
        result: OutcomeResult,
    },
    End,
    Error {
        code: StatusCode,
        message: String,
        description: Option<String>,
    },
    Suspension {
        awaiting: Vec<u32>,
    },
    GetState {
        key: Vec<u8>,
        /// `None` means the key is absent (or the value is still pending).
        value: Option<Payload>,
    },
    SetState {
        key: Vec<u8>,
        value: Payload,
    },
    ClearState {
        key: Vec<u8>,
    },
    ClearAllState,
    GetStateKeys {
        keys: Vec<Vec<u8>>,
    },
    Sleep {
        duration_millis: u64,
    },
    InvokeService {
        target: ServiceTarget,
        body: Payload,
        response: Option<OutcomeResult>,
    },
    BackgroundInvoke {
        target: ServiceTarget,
        body: Payload,
        delay_millis: u64,
    },
    SideEffect {
        result: Option<OutcomeResult>,
    },
    Awakeable {
        id: String,
        value: Option<OutcomeResult>,
    },
    CompleteAwakeable {
        id: String,
        value: OutcomeResult,
    },
}

impl EntryPayload {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Start { .. } => EntryKind::Start,
            Self::PollInput { .. } => EntryKind::PollInput,
            Self::Output { .. } => EntryKind::Output,
            Self::End => EntryKind::End,
            Self::Error { .. } => EntryKind::Error,
            Self::Suspension { .. } => EntryKind::Suspension,
            Self::GetState { .. } => EntryKind::GetState,
            Self::SetState { .. } => EntryKind::SetState,
            Self::ClearState { .. } => EntryKind::ClearState,
            Self::ClearAllState => EntryKind::ClearAllState,
            Self::GetStateKeys { .. } => EntryKind::GetStateKeys,
            Self::Sleep { .. } => EntryKind::Sleep,
            Self::InvokeService { .. } => EntryKind::InvokeService,
            Self::BackgroundInvoke { .. } => EntryKind::BackgroundInvoke,
            Self::SideEffect { .. } => EntryKind::SideEffect,
            Self::Awakeable { .. } => EntryKind::Awakeable,
            Self::CompleteAwakeable { .. } => EntryKind::CompleteAwakeable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kind_matches_entry_kind() {
        let p = EntryPayload::SetState {
            key: b"k".to_vec(),
            value: Payload::new(b"v".to_vec()),
        };
        assert_eq!(p.kind(), EntryKind::SetState);
    }

    #[test]
    fn only_blocking_kinds_report_blocking() {
        assert!(EntryKind::Sleep.is_blocking());
        assert!(EntryKind::SideEffect.is_blocking());
        assert!(EntryKind::GetState.is_blocking());
        assert!(!EntryKind::SetState.is_blocking());
        assert!(!EntryKind::ClearAllState.is_blocking());
    }

    #[test]
    fn only_session_terminal_kinds_report_terminal() {
        assert!(EntryKind::End.is_session_terminal());
        assert!(EntryKind::Suspension.is_session_terminal());
        assert!(EntryKind::Error.is_session_terminal());
        assert!(!EntryKind::Output.is_session_terminal());
        assert!(!EntryKind::SetState.is_session_terminal());
        assert!(!EntryKind::Start.is_session_terminal());
    }
}
