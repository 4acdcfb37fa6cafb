//! Converts a handler's return value into `Output`/`Error`/`Suspension`
//! journal entries (SPEC_FULL.md §4.3).

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use durable_types::{HandlerError, OutcomeResult, Payload, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{Instrument, error, info, info_span};

use crate::context::Context;
use crate::error::RuntimeError;
use crate::machine::{Machine, Signal};

/// A registered invocation handler. Implementors own the business logic;
/// everything journal-related is reached through `Context`.
#[async_trait]
pub trait Handler<S>: Send + Sync
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, ctx: Context<S>, input: Payload) -> Result<Payload, Signal>;
}

/// Drives one invocation's handler to completion and frames its outcome
/// (§4.3). The handler runs on its own `tokio` task so a panic surfaces as a
/// `JoinError` rather than unwinding into the Machine's own task — the
/// "any panic not a suspension signal becomes a non-terminal Error" rule.
pub struct HandlerInvoker;

impl HandlerInvoker {
    pub async fn run<S>(
        machine: Machine<S>,
        handler: Arc<dyn Handler<S>>,
        argument: Payload,
    ) -> Result<(), RuntimeError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let span = info_span!("invocation", debug_id = %machine.debug_id());
        let task_machine = machine.clone();

        let joined = tokio::spawn(
            async move {
                let ctx = Context::new(task_machine);
                handler.handle(ctx, argument).await
            }
            .instrument(span.clone()),
        )
        .await;

        async move {
            let outcome = match joined {
                Ok(result) => result,
                Err(join_err) if join_err.is_panic() => {
                    let description = panic_message(join_err.into_panic());
                    error!(description, "handler panicked");
                    Err(Signal::Failed(
                        HandlerError::new(StatusCode::Internal, "handler panicked")
                            .with_detail(description),
                    ))
                }
                Err(join_err) => {
                    error!(%join_err, "handler task did not complete");
                    Err(Signal::Failed(HandlerError::new(
                        StatusCode::Internal,
                        "handler task was cancelled",
                    )))
                }
            };

            match outcome {
                Ok(value) => {
                    info!("handler returned successfully");
                    machine.emit_output(OutcomeResult::Success(value)).await
                }
                Err(Signal::Failed(err)) if err.terminal => {
                    info!(code = ?err.code, "handler returned a terminal failure");
                    machine
                        .emit_output(OutcomeResult::Failure {
                            code: err.code,
                            message: err.message,
                            terminal: true,
                        })
                        .await
                }
                Err(Signal::Failed(err)) => {
                    info!(code = ?err.code, "handler returned a non-terminal failure");
                    machine.emit_error(err.code, err.message, err.detail).await
                }
                Err(Signal::Suspended(suspended)) => {
                    info!(index = %suspended.0, "handler suspended");
                    machine.emit_suspension(vec![suspended.0.0]).await
                }
                Err(Signal::Fatal(err)) => {
                    error!(%err, "fatal runtime error, reporting as non-terminal INTERNAL");
                    machine.emit_error(StatusCode::Internal, err.to_string(), None).await?;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}
