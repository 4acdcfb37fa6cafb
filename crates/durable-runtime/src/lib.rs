//! Client-side runtime core for a durable-execution platform (SPEC_FULL.md).
//!
//! Each invocation gets one [`Machine`], built from a duplex byte stream via
//! [`Machine::start`], then driven to completion by [`HandlerInvoker::run`]
//! against a user-supplied [`Handler`]. [`serve`] wires the two together as
//! the single entry point a transport layer calls per accepted connection.

pub mod backoff;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod invoker;
pub mod machine;
pub mod message;
pub mod suspend;

pub use backoff::BackoffPolicy;
pub use codec::{Codec, RawFrame};
pub use config::RuntimeConfig;
pub use context::Context;
pub use error::RuntimeError;
pub use invoker::{Handler, HandlerInvoker};
pub use machine::{Machine, Signal};
pub use suspend::Suspended;

use std::sync::Arc;

use durable_types::Payload;
use tokio::io::{AsyncRead, AsyncWrite};

/// Runs one invocation session to completion: handshake, handler dispatch,
/// and terminal framing (§4.2-§4.7). Intended to be spawned as its own
/// `tokio` task per accepted connection (§5).
pub async fn serve<S>(
    stream: S,
    config: RuntimeConfig,
    handler: Arc<dyn Handler<S>>,
) -> Result<(), RuntimeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (machine, argument) = Machine::start(stream, config).await?;
    HandlerInvoker::run(machine, handler, argument).await
}
