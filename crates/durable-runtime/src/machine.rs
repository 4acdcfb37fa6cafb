//! The per-invocation state machine: handshake, replay-or-new primitive, and
//! terminal-message framing (SPEC_FULL.md §4.2, §4.4, §4.7).

use std::sync::Arc;

use durable_journal::{
    JournalError, JournalViolation, ReplayPrefix, SessionOutcomeGuard, StateCache,
    check_kind_match,
};
use durable_types::{
    EntryIndex, EntryKind, EntryPayload, HandlerError, JournalEntry, OutcomeResult, Payload, StatusCode,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::codec::Codec;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::message;
use crate::suspend::Suspended;

/// Everything a journaled operation can fail with, short of returning a value.
///
/// `Suspended` and `Failed` are observable outcomes the `HandlerInvoker` turns
/// into `Suspension`/`Output` entries; `Fatal` bypasses the handler entirely
/// per SPEC_FULL.md §7's propagation policy.
#[derive(Debug)]
pub enum Signal {
    Suspended(Suspended),
    Failed(HandlerError),
    Fatal(RuntimeError),
}

impl Signal {
    pub(crate) fn fatal_journal(violation: JournalViolation) -> Self {
        Signal::Fatal(RuntimeError::Journal(JournalError::InvariantViolation(violation)))
    }
}

impl From<Suspended> for Signal {
    fn from(suspended: Suspended) -> Self {
        Signal::Suspended(suspended)
    }
}

impl From<RuntimeError> for Signal {
    fn from(err: RuntimeError) -> Self {
        Signal::Fatal(err)
    }
}

pub(crate) struct MachineState<S> {
    pub(crate) index: EntryIndex,
    pub(crate) prefix: ReplayPrefix,
    pub(crate) state_cache: StateCache,
    pub(crate) codec: Codec<S>,
    outcome: SessionOutcomeGuard,
}

/// One `Machine` per invocation (SPEC_FULL.md §2, §5).
///
/// Cheap to clone: the mutable state lives behind the `Arc<Mutex<_>>`, which
/// is exactly the back-reference [`crate::context::Context`] needs to be
/// `Clone` and moved into spawned sub-tasks of the handler (§9).
pub struct Machine<S> {
    pub(crate) state: Arc<Mutex<MachineState<S>>>,
    debug_id: String,
    config: RuntimeConfig,
}

impl<S> Clone for Machine<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            debug_id: self.debug_id.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S> Machine<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Performs the handshake (§4.2 steps 1-6): reads `Start`, checks the
    /// protocol version, seeds the State Cache, then reads the input entry
    /// and the rest of the replay prefix. Returns the built `Machine` plus
    /// the decoded invocation argument.
    pub async fn start(stream: S, config: RuntimeConfig) -> Result<(Self, Payload), RuntimeError> {
        let mut codec = Codec::new(stream);

        let start_frame = codec.read_frame().await?.ok_or(RuntimeError::UnexpectedEof)?;
        if start_frame.kind != EntryKind::Start {
            return Err(unexpected("Start", start_frame.kind));
        }

        let (protocol_version, debug_id, known_entries, state, partial) =
            match message::decode(&start_frame.payload)? {
                EntryPayload::Start {
                    protocol_version,
                    debug_id,
                    known_entries,
                    state,
                    partial,
                } => (protocol_version, debug_id, known_entries, state, partial),
                other => return Err(unexpected("Start", other.kind())),
            };

        if protocol_version != config.protocol_version() {
            return Err(RuntimeError::Journal(JournalError::InvariantViolation(
                JournalViolation::UnsupportedVersion {
                    got: protocol_version,
                    supported: config.protocol_version(),
                },
            )));
        }

        let state_cache = StateCache::build(state, partial);

        let input_frame = codec.read_frame().await?.ok_or(RuntimeError::UnexpectedEof)?;
        if input_frame.kind != EntryKind::PollInput {
            return Err(unexpected("PollInput", input_frame.kind));
        }
        let argument = match message::decode(&input_frame.payload)? {
            EntryPayload::PollInput { argument } => argument,
            other => return Err(unexpected("PollInput", other.kind())),
        };

        let mut entries = Vec::with_capacity(known_entries as usize);
        entries.push(JournalEntry::new(
            EntryIndex(0),
            EntryPayload::PollInput {
                argument: argument.clone(),
            },
            true,
        ));

        for idx in 1..known_entries {
            let frame = codec.read_frame().await?.ok_or(RuntimeError::UnexpectedEof)?;
            let payload = message::decode(&frame.payload)?;
            entries.push(JournalEntry::new(EntryIndex(idx), payload, frame.completed));
        }

        debug!(%debug_id, known_entries, partial, "invocation started");

        let state = MachineState {
            index: EntryIndex(1),
            prefix: ReplayPrefix::build(entries),
            state_cache,
            codec,
            outcome: SessionOutcomeGuard::new(),
        };

        Ok((
            Self {
                state: Arc::new(Mutex::new(state)),
                debug_id,
                config,
            },
            argument,
        ))
    }

    pub fn debug_id(&self) -> &str {
        &self.debug_id
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The replay-or-new primitive (§4.4). `blocking` is taken as an explicit
    /// argument rather than derived from `kind` alone because `GetState` is
    /// "maybe" blocking depending on State Cache coverage (§4.6) — only the
    /// caller in `Context::get` knows which case applies.
    pub(crate) async fn replay_or_new<T>(
        &self,
        kind: EntryKind,
        blocking: bool,
        build_payload: impl FnOnce() -> EntryPayload,
        decode: impl FnOnce(EntryPayload) -> T,
    ) -> Result<T, Signal> {
        let mut state = self.state.lock().await;
        let index = state.index;

        if let Some(entry) = state.prefix.entry_at(index).cloned() {
            check_kind_match(index, entry.payload.kind().name(), kind.name())
                .map_err(Signal::fatal_journal)?;

            if blocking && !entry.completed {
                warn!(%index, kind = kind.name(), "suspending: awaited entry not yet completed");
                return Err(Signal::Suspended(Suspended(index)));
            }

            state.index = index.next();
            return Ok(decode(entry.payload));
        }

        let payload = build_payload();
        let bytes = message::encode(&payload).map_err(Signal::Fatal)?;
        state
            .codec
            .write_frame(kind, !blocking, blocking, &bytes)
            .await
            .map_err(Signal::Fatal)?;

        if !blocking {
            state.index = index.next();
            return Ok(decode(payload));
        }

        loop {
            let frame = state
                .codec
                .read_frame()
                .await
                .map_err(Signal::Fatal)?
                .ok_or(Signal::Fatal(RuntimeError::UnexpectedEof))?;

            if frame.kind != kind {
                return Err(Signal::fatal_journal(JournalViolation::UnexpectedMessage {
                    expected: kind.name(),
                    actual: frame.kind.name(),
                }));
            }

            let completion = message::decode(&frame.payload).map_err(Signal::Fatal)?;
            state.index = index.next();
            return Ok(decode(completion));
        }
    }

    /// §4.7: writes `Output` then `End`. A failed `End` write is still
    /// reported to the caller as a fatal error rather than swallowed (Open
    /// Question decision, see DESIGN.md).
    pub(crate) async fn emit_output(&self, result: OutcomeResult) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().await;
        state
            .outcome
            .check_emit("Output")
            .map_err(|v| RuntimeError::Journal(JournalError::InvariantViolation(v)))?;

        let bytes = message::encode(&EntryPayload::Output { result })?;
        state.codec.write_frame(EntryKind::Output, true, false, &bytes).await?;

        let end_bytes = message::encode(&EntryPayload::End)?;
        if let Err(err) = state.codec.write_frame(EntryKind::End, true, false, &end_bytes).await {
            error!(%err, "failed to write End after a successful Output");
            return Err(err);
        }
        Ok(())
    }

    /// §4.5: writes a single `Suspension` message. No `End` follows.
    pub(crate) async fn emit_suspension(&self, awaiting: Vec<u32>) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().await;
        state
            .outcome
            .check_emit("Suspension")
            .map_err(|v| RuntimeError::Journal(JournalError::InvariantViolation(v)))?;

        let bytes = message::encode(&EntryPayload::Suspension { awaiting })?;
        state.codec.write_frame(EntryKind::Suspension, true, false, &bytes).await
    }

    /// Non-terminal failure path (§4.3): one `Error` entry, no `End`.
    pub(crate) async fn emit_error(
        &self,
        code: StatusCode,
        message_text: String,
        description: Option<String>,
    ) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().await;
        state
            .outcome
            .check_emit("Error")
            .map_err(|v| RuntimeError::Journal(JournalError::InvariantViolation(v)))?;

        let bytes = message::encode(&EntryPayload::Error {
            code,
            message: message_text,
            description,
        })?;
        state.codec.write_frame(EntryKind::Error, true, false, &bytes).await
    }
}

fn unexpected(expected: &'static str, actual: EntryKind) -> RuntimeError {
    RuntimeError::Journal(JournalError::InvariantViolation(JournalViolation::UnexpectedMessage {
        expected,
        actual: actual.name(),
    }))
}
