//! The handler-facing façade (SPEC_FULL.md §3, §4.6, §9).

use std::future::Future;
use std::time::Duration;

use durable_journal::StateLookup;
use durable_types::{EntryKind, EntryPayload, HandlerError, OutcomeResult, Payload, ServiceTarget, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep as tokio_sleep;

use crate::backoff::BackoffPolicy;
use crate::machine::{Machine, Signal};

/// One `Context` per invocation, never shared across invocations (§3).
///
/// Cheap to `Clone` — see `Machine`'s own `Clone` impl and §9's back-reference
/// note: the Context holds a lookup relation to the Machine, not ownership.
#[derive(Clone)]
pub struct Context<S> {
    machine: Machine<S>,
}

impl<S> Context<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(machine: Machine<S>) -> Self {
        Self { machine }
    }

    /// `Set(k, v)` — SPEC_FULL.md §4.6: never blocks.
    pub async fn set(&self, key: impl Into<Vec<u8>>, value: Payload) -> Result<(), Signal> {
        let key = key.into();
        let cache_key = key.clone();
        let cache_value = value.clone();

        self.machine
            .replay_or_new(
                EntryKind::SetState,
                false,
                move || EntryPayload::SetState { key, value },
                |_| (),
            )
            .await?;

        self.machine.state.lock().await.state_cache.set(cache_key, cache_value);
        Ok(())
    }

    /// `Clear(k)` — never blocks.
    pub async fn clear(&self, key: impl Into<Vec<u8>>) -> Result<(), Signal> {
        let key = key.into();
        let cache_key = key.clone();

        self.machine
            .replay_or_new(
                EntryKind::ClearState,
                false,
                move || EntryPayload::ClearState { key },
                |_| (),
            )
            .await?;

        self.machine.state.lock().await.state_cache.clear(&cache_key);
        Ok(())
    }

    /// `ClearAll()` — never blocks.
    pub async fn clear_all(&self) -> Result<(), Signal> {
        self.machine
            .replay_or_new(
                EntryKind::ClearAllState,
                false,
                || EntryPayload::ClearAllState,
                |_| (),
            )
            .await?;

        self.machine.state.lock().await.state_cache.clear_all();
        Ok(())
    }

    /// `Get(k)` — blocking is conditional on State Cache coverage (§4.6): a
    /// cache hit (or a complete cache reporting known-absence) answers
    /// directly from the cache with no journal entry at all (Testable
    /// Property 5); only a partial-cache miss emits and awaits a fetch.
    pub async fn get(&self, key: &[u8]) -> Result<Option<Payload>, Signal> {
        let lookup = self.machine.state.lock().await.state_cache.get(key);

        match lookup {
            StateLookup::Known(value) => Ok(value),
            StateLookup::Unknown => {
                let key_owned = key.to_vec();
                let fetched = self
                    .machine
                    .replay_or_new(
                        EntryKind::GetState,
                        true,
                        move || EntryPayload::GetState {
                            key: key_owned,
                            value: None,
                        },
                        Self::decode_get_state,
                    )
                    .await?;

                let mut state = self.machine.state.lock().await;
                match &fetched {
                    Some(value) => state.state_cache.set(key.to_vec(), value.clone()),
                    None => state.state_cache.clear(key),
                }
                Ok(fetched)
            }
        }
    }

    fn decode_get_state(payload: EntryPayload) -> Option<Payload> {
        match payload {
            EntryPayload::GetState { value, .. } => value,
            _ => unreachable!("kind checked by Machine::replay_or_new"),
        }
    }

    /// `Keys()` — always blocking per SPEC_FULL.md §4.6's table (unlike `Get`
    /// it has no partial-state escape hatch).
    pub async fn keys(&self) -> Result<Vec<Vec<u8>>, Signal> {
        self.machine
            .replay_or_new(
                EntryKind::GetStateKeys,
                true,
                || EntryPayload::GetStateKeys { keys: Vec::new() },
                |payload| match payload {
                    EntryPayload::GetStateKeys { keys } => keys,
                    _ => unreachable!("kind checked by Machine::replay_or_new"),
                },
            )
            .await
    }

    /// `Sleep(until)` — duration is computed at new-entry time; on replay
    /// the stored duration is authoritative (§4.6 determinism constraint).
    pub async fn sleep(&self, duration: Duration) -> Result<(), Signal> {
        let duration_millis = duration.as_millis() as u64;
        self.machine
            .replay_or_new(
                EntryKind::Sleep,
                true,
                move || EntryPayload::Sleep { duration_millis },
                |_| (),
            )
            .await
    }

    /// `Call(service, method, key, body)` — blocks on the callee's response;
    /// a callee failure is surfaced to the handler per §7's propagation
    /// policy ("`Call` returning the callee's failure" is user-visible).
    pub async fn call(&self, target: ServiceTarget, body: Payload) -> Result<Payload, Signal> {
        let response = self
            .machine
            .replay_or_new(
                EntryKind::InvokeService,
                true,
                move || EntryPayload::InvokeService {
                    target,
                    body,
                    response: None,
                },
                |payload| match payload {
                    EntryPayload::InvokeService { response, .. } => response,
                    _ => unreachable!("kind checked by Machine::replay_or_new"),
                },
            )
            .await?;

        Self::outcome_to_result(response)
    }

    /// `Send(service, method, key, body, delay)` — fire-and-forget, never
    /// blocks.
    pub async fn send(&self, target: ServiceTarget, body: Payload, delay: Duration) -> Result<(), Signal> {
        let delay_millis = delay.as_millis() as u64;
        self.machine
            .replay_or_new(
                EntryKind::BackgroundInvoke,
                false,
                move || EntryPayload::BackgroundInvoke {
                    target,
                    body,
                    delay_millis,
                },
                |_| (),
            )
            .await
    }

    /// `SideEffect(fn, backoff)` — `fn` runs at most once across all replays
    /// of an invocation (Testable Property 3): on replay the stored result is
    /// returned verbatim and `fn` is never called; on a fresh issue, `fn`
    /// retries in-process per `backoff` and only the final outcome is
    /// journaled (§4.6, §9).
    pub async fn side_effect<F, Fut>(&self, backoff: BackoffPolicy, mut f: F) -> Result<Payload, Signal>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Payload, HandlerError>>,
    {
        let is_replay = {
            let state = self.machine.state.lock().await;
            state.prefix.entry_at(state.index).is_some()
        };

        if is_replay {
            let result = self
                .machine
                .replay_or_new(
                    EntryKind::SideEffect,
                    true,
                    || unreachable!("a replayed SideEffect never builds a fresh payload"),
                    Self::decode_side_effect,
                )
                .await?;
            return Self::outcome_to_result(result);
        }

        let mut attempt = 0u32;
        let outcome = loop {
            attempt += 1;
            match f().await {
                Ok(value) => break OutcomeResult::Success(value),
                Err(err) if err.terminal || attempt >= backoff.max_attempts() => {
                    break OutcomeResult::Failure {
                        code: err.code,
                        message: err.message,
                        terminal: err.terminal,
                    };
                }
                Err(_) => tokio_sleep(backoff.delay_for(attempt)).await,
            }
        };

        let completed = self
            .machine
            .replay_or_new(
                EntryKind::SideEffect,
                true,
                move || EntryPayload::SideEffect {
                    result: Some(outcome.clone()),
                },
                Self::decode_side_effect,
            )
            .await?;

        Self::outcome_to_result(completed)
    }

    fn decode_side_effect(payload: EntryPayload) -> Option<OutcomeResult> {
        match payload {
            EntryPayload::SideEffect { result } => result,
            _ => unreachable!("kind checked by Machine::replay_or_new"),
        }
    }

    fn outcome_to_result(outcome: Option<OutcomeResult>) -> Result<Payload, Signal> {
        match outcome {
            Some(OutcomeResult::Success(value)) => Ok(value),
            Some(OutcomeResult::Failure { code, message, terminal }) => {
                let err = if terminal {
                    HandlerError::terminal(code, message)
                } else {
                    HandlerError::new(code, message)
                };
                Err(Signal::Failed(err))
            }
            None => Err(Signal::Failed(HandlerError::new(
                StatusCode::Internal,
                "completion carried no result",
            ))),
        }
    }
}
