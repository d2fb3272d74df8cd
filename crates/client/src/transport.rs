//! Collaborator seams for the retry engine.
//!
//! The storage wire protocol lives behind [`StorageTransport`]: the engine
//! asks for a put, gets back a [`PutHandle`], and consumes completion events
//! from it. A well-behaved transport emits exactly one event per attempt, but
//! the contract tolerates more — a broken-pipe error trailing a response is
//! the classic case — and the engine makes redundant signals inert.

use std::path::Path;

use backhaul_core::Headers;
use tokio::sync::mpsc;

/// Network-level failure raised by a transport during one put attempt.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Response observed for one put attempt.
#[derive(Debug, Clone)]
pub struct PutResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// One completion signal for an in-flight put.
#[derive(Debug, Clone)]
pub enum PutEvent {
    Response(PutResponse),
    Error(TransportError),
}

/// Transport side of a put: emits completion signals into the handle.
#[derive(Debug, Clone)]
pub struct PutSink {
    tx: mpsc::UnboundedSender<PutEvent>,
}

impl PutSink {
    pub fn respond(&self, status: u16, body: Vec<u8>) {
        self.emit(PutEvent::Response(PutResponse { status, body }));
    }

    pub fn fail(&self, error: TransportError) {
        self.emit(PutEvent::Error(error));
    }

    /// Delivery is best-effort: once the engine has dropped the handle there
    /// is nobody left to notify.
    pub fn emit(&self, event: PutEvent) {
        let _ = self.tx.send(event);
    }
}

/// Engine side of a put: the stream of completion signals for one attempt.
#[derive(Debug)]
pub struct PutHandle {
    rx: mpsc::UnboundedReceiver<PutEvent>,
}

impl PutHandle {
    /// Wait for the next signal; `None` once the transport is gone.
    pub async fn next_event(&mut self) -> Option<PutEvent> {
        self.rx.recv().await
    }

    /// Take a signal that is already queued, without waiting.
    pub fn try_next_event(&mut self) -> Option<PutEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create a connected sink/handle pair for one put attempt.
pub fn put_channel() -> (PutSink, PutHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PutSink { tx }, PutHandle { rx })
}

/// Issues one storage put per call.
///
/// Implementations are shared read-only across concurrent uploads; all
/// per-attempt state lives in the returned handle. The payload and headers
/// are borrowed per attempt and never mutated by the engine once the attempt
/// is in flight.
pub trait StorageTransport: Send + Sync {
    fn put(&self, destination: &str, headers: &Headers, payload: &[u8]) -> PutHandle;
}

/// Maps a source path to a MIME type.
///
/// Total: unknown extensions fall back to a default type, never an error.
pub trait ContentTypeResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> String;
}

#[cfg(test)]
mod tests {
    use super::{put_channel, PutEvent, TransportError};

    #[tokio::test]
    async fn handle_sees_events_in_emission_order() {
        let (sink, mut handle) = put_channel();
        sink.respond(200, b"ok".to_vec());
        sink.fail(TransportError::new("broken pipe"));
        drop(sink);

        assert!(matches!(
            handle.next_event().await,
            Some(PutEvent::Response(ref r)) if r.status == 200
        ));
        assert!(matches!(handle.next_event().await, Some(PutEvent::Error(_))));
        assert!(handle.next_event().await.is_none());
    }

    #[tokio::test]
    async fn emit_after_handle_dropped_is_silent() {
        let (sink, handle) = put_channel();
        drop(handle);
        sink.respond(200, Vec::new());
    }
}
