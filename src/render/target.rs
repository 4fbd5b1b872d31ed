//! Render targets and the render event stream.
//!
//! # Responsibilities
//! - Define the capability interface a render target must provide: accept a
//!   context, produce streamable output
//! - Carry render progress as explicit events (shell error, recoverable
//!   error, readiness, chunks) over a bounded channel
//! - Expose an idempotent abort handle cancelling the producer
//!
//! # Design Decisions
//! - The producer closing its channel is the completion signal; there is no
//!   separate "done" event to misuse
//! - Abort is a `CancellationToken` cancel: idempotent, observable from the
//!   producer side, harmless after completion

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::render::context::RenderContext;

/// A rendering failure, shell-level or mid-stream.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Progress events emitted by a render producer.
#[derive(Debug)]
pub enum RenderEvent {
    /// The initial render failed before any output was produced. Terminal:
    /// a clean error response can still be sent.
    ShellError(RenderError),

    /// A failure after the shell succeeded. Logged; the stream continues.
    RenderError(RenderError),

    /// Every data dependency resolved; body chunks follow.
    AllReady,

    /// One chunk of rendered output, piped through verbatim.
    Chunk(Bytes),
}

/// Producer half handed to a render target's task.
pub struct RenderProducer {
    tx: mpsc::Sender<RenderEvent>,
    cancel: CancellationToken,
}

impl RenderProducer {
    pub async fn all_ready(&self) {
        let _ = self.tx.send(RenderEvent::AllReady).await;
    }

    pub async fn chunk(&self, bytes: impl Into<Bytes>) {
        let _ = self.tx.send(RenderEvent::Chunk(bytes.into())).await;
    }

    pub async fn render_error(&self, message: impl Into<String>) {
        let _ = self
            .tx
            .send(RenderEvent::RenderError(RenderError::new(message)))
            .await;
    }

    /// Report a fatal pre-stream failure. Consumes the producer: nothing
    /// may follow a shell error.
    pub async fn shell_error(self, message: impl Into<String>) {
        let _ = self
            .tx
            .send(RenderEvent::ShellError(RenderError::new(message)))
            .await;
    }

    /// True once the render has been aborted (timeout or disconnect).
    /// Producers should stop emitting promptly when this flips.
    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the render is aborted.
    pub async fn aborted(&self) {
        self.cancel.cancelled().await;
    }
}

/// Idempotent abort handle for a running render.
#[derive(Clone)]
pub struct AbortHandle(CancellationToken);

impl AbortHandle {
    /// Cancel the producer. Safe to call at any time, any number of times;
    /// aborting an already-finished render has no observable effect.
    pub fn abort(&self) {
        self.0.cancel();
    }
}

/// Consumer half: the event stream driven by the lifecycle controller.
pub struct RenderStream {
    rx: mpsc::Receiver<RenderEvent>,
    cancel: CancellationToken,
}

impl RenderStream {
    /// Create a linked producer/stream pair. The producer observes `cancel`
    /// as its abort signal.
    pub fn channel(cancel: CancellationToken) -> (RenderProducer, RenderStream) {
        let (tx, rx) = mpsc::channel(16);
        let producer = RenderProducer {
            tx,
            cancel: cancel.clone(),
        };
        (producer, RenderStream { rx, cancel })
    }

    /// Spawn an async producer task; the usual way to implement a target.
    pub fn spawn<F, Fut>(ctx: &RenderContext, f: F) -> RenderStream
    where
        F: FnOnce(RenderProducer) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (producer, stream) = Self::channel(ctx.cancel.child_token());
        tokio::spawn(f(producer));
        stream
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.cancel.clone())
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Next event; `None` once the producer is done (or aborted and gone).
    pub async fn recv(&mut self) -> Option<RenderEvent> {
        self.rx.recv().await
    }

    pub(crate) fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<RenderEvent>> {
        self.rx.poll_recv(cx)
    }
}

/// A render target accepts a per-request context and produces streamable
/// output. What it draws and how is opaque to the pipeline.
pub trait RenderTarget: Send + Sync + 'static {
    fn render(&self, ctx: Arc<RenderContext>) -> RenderStream;
}

/// Render targets known to the server, looked up by the id a route names.
#[derive(Default)]
pub struct TargetRegistry {
    targets: HashMap<String, Arc<dyn RenderTarget>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, target: Arc<dyn RenderTarget>) {
        self.targets.insert(id.into(), target);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn RenderTarget>> {
        self.targets.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.targets.contains_key(id)
    }
}
