//! Scripted collaborators for exercising the retry engine without a network.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use backhaul_core::{Headers, UploaderConfig};

use crate::engine::Uploader;
use crate::transport::{
    put_channel, ContentTypeResolver, PutEvent, PutHandle, PutSink, StorageTransport,
    TransportError,
};

/// Signals one scripted attempt will emit, in order, before the handle closes.
#[derive(Debug, Clone, Default)]
pub struct AttemptScript {
    events: Vec<PutEvent>,
}

impl AttemptScript {
    /// A 200 response with a small body.
    pub fn ok() -> Self {
        Self::default().then_response(200, b"ok".to_vec())
    }

    /// A single response with the given status.
    pub fn status(status: u16) -> Self {
        Self::default().then_response(status, Vec::new())
    }

    /// A single transport error.
    pub fn transport_error(message: &str) -> Self {
        Self::default().then_transport_error(message)
    }

    /// No signal at all: the transport vanishes mid-attempt.
    pub fn silence() -> Self {
        Self::default()
    }

    pub fn then_response(mut self, status: u16, body: Vec<u8>) -> Self {
        self.events
            .push(PutEvent::Response(crate::transport::PutResponse {
                status,
                body,
            }));
        self
    }

    pub fn then_transport_error(mut self, message: &str) -> Self {
        self.events
            .push(PutEvent::Error(TransportError::new(message)));
        self
    }
}

/// What one scripted put attempt observed.
#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub destination: String,
    pub headers: Headers,
    pub payload: Vec<u8>,
}

/// Transport that replays per-attempt scripts and records what it saw.
///
/// Attempts beyond the last script replay that last script, so an
/// always-failing transport is a one-entry script.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Vec<AttemptScript>,
    attempts: AtomicU32,
    seen: Mutex<Vec<RecordedPut>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<AttemptScript>) -> Self {
        Self {
            scripts,
            ..Self::default()
        }
    }

    /// Puts issued so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<RecordedPut> {
        self.seen.lock().unwrap().clone()
    }
}

impl StorageTransport for ScriptedTransport {
    fn put(&self, destination: &str, headers: &Headers, payload: &[u8]) -> PutHandle {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) as usize;
        self.seen.lock().unwrap().push(RecordedPut {
            destination: destination.to_string(),
            headers: headers.clone(),
            payload: payload.to_vec(),
        });

        let (sink, handle) = put_channel();
        let script = self.scripts.get(attempt).or_else(|| self.scripts.last());
        if let Some(script) = script {
            for event in &script.events {
                sink.emit(event.clone());
            }
        }
        handle
    }
}

/// Transport whose puts never complete: sinks are parked so the handle stays
/// open forever. For exercising cancellation.
#[derive(Default)]
pub struct StalledTransport {
    attempts: AtomicU32,
    parked: Mutex<Vec<PutSink>>,
}

impl StalledTransport {
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl StorageTransport for StalledTransport {
    fn put(&self, _destination: &str, _headers: &Headers, _payload: &[u8]) -> PutHandle {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let (sink, handle) = put_channel();
        self.parked.lock().unwrap().push(sink);
        handle
    }
}

/// Resolver that always answers with the same content type.
#[derive(Debug, Clone)]
pub struct FixedResolver(pub &'static str);

impl ContentTypeResolver for FixedResolver {
    fn resolve(&self, _path: &Path) -> String {
        self.0.to_string()
    }
}

/// Config with dummy credentials and a 1 ms backoff unit so retry tests
/// finish quickly.
pub fn config(max_retries: u32) -> UploaderConfig {
    let mut config = UploaderConfig::new("test-key", "test-secret", "test-bucket");
    config.max_retries = max_retries;
    config.backoff_interval_ms = 1;
    config
}

/// Uploader over a [`ScriptedTransport`], plus the transport for assertions.
pub fn uploader_with(
    max_retries: u32,
    scripts: Vec<AttemptScript>,
) -> (Uploader, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new(scripts));
    let uploader = Uploader::with_transport(
        config(max_retries),
        transport.clone(),
        Arc::new(FixedResolver("application/octet-stream")),
    )
    .expect("test config is valid");
    (uploader, transport)
}
