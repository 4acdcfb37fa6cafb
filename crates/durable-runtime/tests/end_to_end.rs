//! End-to-end scenarios from SPEC_FULL.md §8, driving a [`Machine`] over an
//! in-memory `tokio::io::duplex` the way `codec.rs`'s own tests do.
//!
//! `anyhow` is the integration-test harness's error type (SPEC_FULL.md's
//! ambient-stack notes: the library crates stay on `thiserror`, `anyhow` is
//! reserved for this harness and the teacher's own example binaries).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use durable_runtime::{Codec, Context, Handler, RuntimeConfig, RuntimeError, Signal, serve};
use durable_runtime::message;
use durable_types::{EntryKind, EntryPayload, HandlerError, OutcomeResult, Payload, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};

fn start_payload(known_entries: u32, partial: bool, state: Vec<(Vec<u8>, Vec<u8>)>) -> EntryPayload {
    EntryPayload::Start {
        protocol_version: 1,
        debug_id: "test-invocation".into(),
        known_entries,
        state,
        partial,
    }
}

async fn write_frame<S: AsyncRead + AsyncWrite + Unpin>(
    codec: &mut Codec<S>,
    kind: EntryKind,
    completed: bool,
    payload: &EntryPayload,
) -> anyhow::Result<()> {
    let bytes = message::encode(payload).context("encoding test frame payload")?;
    codec
        .write_frame(kind, completed, false, &bytes)
        .await
        .context("writing test frame")?;
    Ok(())
}

async fn read_payload<S: AsyncRead + AsyncWrite + Unpin>(
    codec: &mut Codec<S>,
) -> anyhow::Result<(EntryKind, EntryPayload)> {
    let frame = codec
        .read_frame()
        .await
        .context("reading response frame")?
        .context("stream closed before the expected frame arrived")?;
    let payload = message::decode(&frame.payload).context("decoding response payload")?;
    Ok((frame.kind, payload))
}

struct DoubleHandler;

#[async_trait]
impl<S> Handler<S> for DoubleHandler
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, _ctx: Context<S>, input: Payload) -> Result<Payload, Signal> {
        let byte = input.as_bytes()[0];
        Ok(Payload::new(vec![byte.wrapping_mul(2)]))
    }
}

#[tokio::test]
async fn fresh_invocation_pure_compute() -> anyhow::Result<()> {
    let (client, server) = tokio::io::duplex(8192);
    let mut client = Codec::new(client);

    write_frame(&mut client, EntryKind::Start, false, &start_payload(1, false, vec![])).await?;
    write_frame(
        &mut client,
        EntryKind::PollInput,
        true,
        &EntryPayload::PollInput {
            argument: Payload::new(vec![1]),
        },
    )
    .await?;

    serve(server, RuntimeConfig::default(), Arc::new(DoubleHandler))
        .await
        .context("serving the invocation")?;

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::Output);
    assert_eq!(
        payload,
        EntryPayload::Output {
            result: OutcomeResult::Success(Payload::new(vec![2])),
        }
    );

    let (kind, _) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::End);
    Ok(())
}

struct SetThenGetHandler;

#[async_trait]
impl<S> Handler<S> for SetThenGetHandler
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, ctx: Context<S>, _input: Payload) -> Result<Payload, Signal> {
        ctx.set("x", Payload::new(vec![0x07])).await?;
        let value = ctx.get(b"x").await?.expect("x must be set");
        Ok(value)
    }
}

// Scenario 2: `Set` replays against a pre-recorded `SetState` entry, then
// `Get` of that same key is answered straight from the State Cache — no
// GetState frame is ever written to the wire, so the very next frame the
// server emits is Output (Testable Property 5).
#[tokio::test]
async fn state_replay_uses_cache_without_new_frames() -> anyhow::Result<()> {
    let (client, server) = tokio::io::duplex(8192);
    let mut client = Codec::new(client);

    write_frame(
        &mut client,
        EntryKind::Start,
        false,
        &start_payload(2, false, vec![(b"x".to_vec(), vec![0x05])]),
    )
    .await?;
    write_frame(
        &mut client,
        EntryKind::PollInput,
        true,
        &EntryPayload::PollInput {
            argument: Payload::new(vec![0]),
        },
    )
    .await?;
    write_frame(
        &mut client,
        EntryKind::SetState,
        true,
        &EntryPayload::SetState {
            key: b"x".to_vec(),
            value: Payload::new(vec![0x07]),
        },
    )
    .await?;

    serve(server, RuntimeConfig::default(), Arc::new(SetThenGetHandler))
        .await
        .context("serving the invocation")?;

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::Output);
    assert_eq!(
        payload,
        EntryPayload::Output {
            result: OutcomeResult::Success(Payload::new(vec![0x07])),
        }
    );
    let (kind, _) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::End);
    Ok(())
}

struct SleepHandler;

#[async_trait]
impl<S> Handler<S> for SleepHandler
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, ctx: Context<S>, _input: Payload) -> Result<Payload, Signal> {
        ctx.sleep(Duration::from_millis(60_000)).await?;
        Ok(Payload::new(vec![]))
    }
}

#[tokio::test]
async fn suspension_on_pending_sleep() -> anyhow::Result<()> {
    let (client, server) = tokio::io::duplex(8192);
    let mut client = Codec::new(client);

    write_frame(&mut client, EntryKind::Start, false, &start_payload(2, false, vec![])).await?;
    write_frame(
        &mut client,
        EntryKind::PollInput,
        true,
        &EntryPayload::PollInput {
            argument: Payload::new(vec![0]),
        },
    )
    .await?;
    write_frame(
        &mut client,
        EntryKind::Sleep,
        false,
        &EntryPayload::Sleep { duration_millis: 60_000 },
    )
    .await?;

    serve(server, RuntimeConfig::default(), Arc::new(SleepHandler))
        .await
        .context("serving the invocation")?;

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::Suspension);
    assert_eq!(payload, EntryPayload::Suspension { awaiting: vec![1] });
    Ok(())
}

struct GetFirstHandler;

#[async_trait]
impl<S> Handler<S> for GetFirstHandler
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, ctx: Context<S>, _input: Payload) -> Result<Payload, Signal> {
        let _ = ctx.get(b"k").await?;
        Ok(Payload::new(vec![]))
    }
}

#[tokio::test]
async fn journal_mismatch_reports_internal_error() -> anyhow::Result<()> {
    let (client, server) = tokio::io::duplex(8192);
    let mut client = Codec::new(client);

    write_frame(&mut client, EntryKind::Start, false, &start_payload(2, true, vec![])).await?;
    write_frame(
        &mut client,
        EntryKind::PollInput,
        true,
        &EntryPayload::PollInput {
            argument: Payload::new(vec![0]),
        },
    )
    .await?;
    write_frame(
        &mut client,
        EntryKind::SetState,
        true,
        &EntryPayload::SetState {
            key: b"k".to_vec(),
            value: Payload::new(vec![1]),
        },
    )
    .await?;

    let result = serve(server, RuntimeConfig::default(), Arc::new(GetFirstHandler)).await;
    assert!(matches!(result, Err(RuntimeError::Journal(_))));

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::Error);
    match payload {
        EntryPayload::Error { code, message, .. } => {
            assert_eq!(code, StatusCode::Internal);
            assert!(message.contains("journal mismatch") || message.contains("handler issued"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
    Ok(())
}

struct TerminalFailureHandler;

#[async_trait]
impl<S> Handler<S> for TerminalFailureHandler
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, _ctx: Context<S>, _input: Payload) -> Result<Payload, Signal> {
        Err(Signal::Failed(HandlerError::terminal(StatusCode::NotFound, "missing")))
    }
}

#[tokio::test]
async fn terminal_failure_yields_output_failure() -> anyhow::Result<()> {
    let (client, server) = tokio::io::duplex(8192);
    let mut client = Codec::new(client);

    write_frame(&mut client, EntryKind::Start, false, &start_payload(1, false, vec![])).await?;
    write_frame(
        &mut client,
        EntryKind::PollInput,
        true,
        &EntryPayload::PollInput {
            argument: Payload::new(vec![0]),
        },
    )
    .await?;

    serve(server, RuntimeConfig::default(), Arc::new(TerminalFailureHandler))
        .await
        .context("serving the invocation")?;

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::Output);
    assert_eq!(
        payload,
        EntryPayload::Output {
            result: OutcomeResult::Failure {
                code: StatusCode::NotFound,
                message: "missing".into(),
                terminal: true,
            },
        }
    );
    Ok(())
}

struct SideEffectHandler {
    called: Arc<AtomicBool>,
    value: u8,
}

#[async_trait]
impl<S> Handler<S> for SideEffectHandler
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, ctx: Context<S>, _input: Payload) -> Result<Payload, Signal> {
        let called = self.called.clone();
        let value = self.value;
        ctx.side_effect(Default::default(), move || {
            let called = called.clone();
            async move {
                called.store(true, Ordering::SeqCst);
                Ok(Payload::new(vec![value]))
            }
        })
        .await
    }
}

// A SideEffect issued fresh (not found in the replay prefix) is a genuine
// network round trip: the Machine writes the entry with `requires_ack=true`
// and blocks reading a completion frame for it. The orchestrator side of that
// exchange has to run concurrently with `serve`, acking the entry before the
// Machine can proceed to Output — so unlike the other scenarios here, this
// test drives `serve` as a spawned task rather than sequentially.
#[tokio::test]
async fn side_effect_runs_once_on_first_issue() -> anyhow::Result<()> {
    let (client, server) = tokio::io::duplex(8192);
    let mut client = Codec::new(client);

    write_frame(&mut client, EntryKind::Start, false, &start_payload(1, false, vec![])).await?;
    write_frame(
        &mut client,
        EntryKind::PollInput,
        true,
        &EntryPayload::PollInput {
            argument: Payload::new(vec![0]),
        },
    )
    .await?;

    let called = Arc::new(AtomicBool::new(false));
    let handler = Arc::new(SideEffectHandler {
        called: called.clone(),
        value: 0xAB,
    });

    let server_task = tokio::spawn(serve(server, RuntimeConfig::default(), handler));

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::SideEffect);
    assert_eq!(
        payload,
        EntryPayload::SideEffect {
            result: Some(OutcomeResult::Success(Payload::new(vec![0xAB]))),
        }
    );
    write_frame(&mut client, EntryKind::SideEffect, true, &payload).await?;

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::Output);
    assert_eq!(
        payload,
        EntryPayload::Output {
            result: OutcomeResult::Success(Payload::new(vec![0xAB])),
        }
    );

    let (kind, _) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::End);

    server_task
        .await
        .context("server task panicked")?
        .context("serving the invocation")?;
    assert!(called.load(Ordering::SeqCst));
    Ok(())
}

#[tokio::test]
async fn side_effect_replay_never_calls_fn_again() -> anyhow::Result<()> {
    let (client, server) = tokio::io::duplex(8192);
    let mut client = Codec::new(client);

    write_frame(&mut client, EntryKind::Start, false, &start_payload(2, false, vec![])).await?;
    write_frame(
        &mut client,
        EntryKind::PollInput,
        true,
        &EntryPayload::PollInput {
            argument: Payload::new(vec![0]),
        },
    )
    .await?;
    write_frame(
        &mut client,
        EntryKind::SideEffect,
        true,
        &EntryPayload::SideEffect {
            result: Some(OutcomeResult::Success(Payload::new(vec![0xAB]))),
        },
    )
    .await?;

    let called = Arc::new(AtomicBool::new(false));
    let handler = Arc::new(SideEffectHandler {
        called: called.clone(),
        value: 0xCD,
    });

    serve(server, RuntimeConfig::default(), handler)
        .await
        .context("serving the invocation")?;
    assert!(!called.load(Ordering::SeqCst), "fn' must not run during replay");

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::Output);
    assert_eq!(
        payload,
        EntryPayload::Output {
            result: OutcomeResult::Success(Payload::new(vec![0xAB])),
        }
    );
    Ok(())
}

struct TerminalSideEffectHandler;

#[async_trait]
impl<S> Handler<S> for TerminalSideEffectHandler
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, ctx: Context<S>, _input: Payload) -> Result<Payload, Signal> {
        ctx.side_effect(Default::default(), || async {
            Err::<Payload, _>(HandlerError::terminal(StatusCode::FailedPrecondition, "cannot proceed"))
        })
        .await
    }
}

// Boundary behavior (§8): a SideEffect whose fn fails terminally on first
// attempt must not be retried, and its terminal-ness must survive the
// SideEffect entry's round trip through the journal — the handler's `?`
// propagation sees a terminal `Signal::Failed`, so the invoker frames it as
// `Output(Failure)`, not a retriable `Error`.
#[tokio::test]
async fn side_effect_terminal_failure_yields_output_failure() -> anyhow::Result<()> {
    let (client, server) = tokio::io::duplex(8192);
    let mut client = Codec::new(client);

    write_frame(&mut client, EntryKind::Start, false, &start_payload(1, false, vec![])).await?;
    write_frame(
        &mut client,
        EntryKind::PollInput,
        true,
        &EntryPayload::PollInput {
            argument: Payload::new(vec![0]),
        },
    )
    .await?;

    let server_task = tokio::spawn(serve(server, RuntimeConfig::default(), Arc::new(TerminalSideEffectHandler)));

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::SideEffect);
    assert_eq!(
        payload,
        EntryPayload::SideEffect {
            result: Some(OutcomeResult::Failure {
                code: StatusCode::FailedPrecondition,
                message: "cannot proceed".into(),
                terminal: true,
            }),
        }
    );
    write_frame(&mut client, EntryKind::SideEffect, true, &payload).await?;

    let (kind, payload) = read_payload(&mut client).await?;
    assert_eq!(kind, EntryKind::Output);
    assert_eq!(
        payload,
        EntryPayload::Output {
            result: OutcomeResult::Failure {
                code: StatusCode::FailedPrecondition,
                message: "cannot proceed".into(),
                terminal: true,
            },
        }
    );

    server_task
        .await
        .context("server task panicked")?
        .context("serving the invocation")?;
    Ok(())
}
