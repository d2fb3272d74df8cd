//! Single-upload retry engine.
//!
//! One logical upload walks `Idle → Attempting → (Succeeded | Retrying |
//! Failed)`. `Retrying` sleeps a full-jitter backoff and re-enters
//! `Attempting`; the two terminal states are reached exactly once per chain,
//! no matter how many completion signals the transport emits. Re-attempts are
//! driven by an explicit loop, so stack depth stays flat regardless of the
//! retry ceiling.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use backhaul_core::backoff::compute_delay;
use backhaul_core::{ConfigError, Headers, OnceGuard, UploaderConfig};
use tracing::{debug, warn};

use crate::http::{HttpTransport, MimeResolver};
use crate::transport::{
    ContentTypeResolver, PutEvent, PutHandle, PutResponse, StorageTransport, TransportError,
};

/// Request timeout applied by [`Uploader::new`] to the built-in transport.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Failure of a single put attempt. Every variant is retryable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AttemptError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("unexpected status {status}")]
    Status { status: u16 },
    #[error("transport closed without a completion signal")]
    Interrupted,
}

/// Terminal failure of one logical upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The source file could not be read. Local and final: reported before
    /// any network attempt and never retried.
    #[error("failed to read {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The retry ceiling was reached; carries the last attempt's error.
    #[error("upload failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: AttemptError,
    },
}

/// Construction failure for [`Uploader::new`].
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Successful upload outcome.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub status: u16,
    pub body: Vec<u8>,
    /// Attempts issued for this upload; 1 when the first try succeeded.
    pub attempts: u32,
}

/// Retrying upload client for one bucket.
///
/// Cheap to clone: the transport and resolver are shared read-only, and
/// concurrent uploads never share mutable state.
#[derive(Clone)]
pub struct Uploader {
    pub(crate) transport: Arc<dyn StorageTransport>,
    pub(crate) resolver: Arc<dyn ContentTypeResolver>,
    pub(crate) config: UploaderConfig,
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Uploader {
    /// Validate `config` and build an uploader over the production HTTP
    /// transport. Fails fast, before any client exists, when a credential or
    /// the bucket is missing.
    pub fn new(config: UploaderConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let transport = HttpTransport::new(&config, DEFAULT_TIMEOUT)?;
        Ok(Self {
            transport: Arc::new(transport),
            resolver: Arc::new(MimeResolver),
            config,
        })
    }

    /// Validate `config` and use caller-supplied collaborators instead of the
    /// production ones (tests, alternative wire protocols).
    pub fn with_transport(
        config: UploaderConfig,
        transport: Arc<dyn StorageTransport>,
        resolver: Arc<dyn ContentTypeResolver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            transport,
            resolver,
            config,
        })
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Upload `payload` to `destination`, retrying failed attempts with
    /// full-jitter exponential backoff up to the configured ceiling.
    ///
    /// Headers are normalized first: `Content-Type` defaults to
    /// `application/octet-stream`, `Content-Length` to the payload length.
    /// The payload and headers are re-read, never mutated, across retries.
    /// Exactly one outcome is returned per call; a non-200 response counts as
    /// a failed attempt just like a transport error.
    pub async fn upload_with_retries(
        &self,
        payload: &[u8],
        mut headers: Headers,
        destination: &str,
    ) -> Result<UploadReceipt, UploadError> {
        headers.normalize(payload.len());

        let completed = OnceGuard::new();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            debug!(destination, attempt = attempts, "issuing put");
            let handle = self.transport.put(destination, &headers, payload);

            match settle_attempt(handle, &completed).await {
                AttemptOutcome::Success(response) => {
                    debug!(destination, attempt = attempts, status = response.status, "upload complete");
                    return Ok(UploadReceipt {
                        status: response.status,
                        body: response.body,
                        attempts,
                    });
                }
                AttemptOutcome::Failure(error) => {
                    if attempts >= self.config.max_retries {
                        let _ = completed.acquire();
                        return Err(UploadError::Exhausted {
                            attempts,
                            source: error,
                        });
                    }
                    let delay = compute_delay(self.config.backoff_interval_ms, attempts);
                    warn!(
                        destination,
                        attempt = attempts,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "put attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

enum AttemptOutcome {
    Success(PutResponse),
    Failure(AttemptError),
}

/// Consume one attempt's signals until the attempt settles.
///
/// The first decisive signal wins: a 200 claims the chain-level completion
/// guard, anything else claims this attempt's settled guard. Signals queued
/// behind the winner are drained through the same guards before the handle is
/// dropped, so duplicates — an error trailing a 200, a second error racing a
/// scheduled retry — are provably inert. A late 200 behind a failure signal
/// still completes the chain rather than forcing a wasted retry.
async fn settle_attempt(mut handle: PutHandle, completed: &OnceGuard) -> AttemptOutcome {
    let settled = OnceGuard::new();
    let mut outcome = None;

    while outcome.is_none() {
        match handle.next_event().await {
            Some(event) => classify(event, completed, &settled, &mut outcome),
            None => {
                if settled.acquire() {
                    outcome = Some(AttemptOutcome::Failure(AttemptError::Interrupted));
                }
                break;
            }
        }
    }

    while let Some(event) = handle.try_next_event() {
        classify(event, completed, &settled, &mut outcome);
    }

    outcome.unwrap_or(AttemptOutcome::Failure(AttemptError::Interrupted))
}

fn classify(
    event: PutEvent,
    completed: &OnceGuard,
    settled: &OnceGuard,
    outcome: &mut Option<AttemptOutcome>,
) {
    match event {
        PutEvent::Response(response) if response.status == 200 => {
            if completed.acquire() {
                *outcome = Some(AttemptOutcome::Success(response));
            }
        }
        PutEvent::Response(response) => {
            if !completed.consumed() && settled.acquire() {
                *outcome = Some(AttemptOutcome::Failure(AttemptError::Status {
                    status: response.status,
                }));
            }
        }
        PutEvent::Error(error) => {
            if !completed.consumed() && settled.acquire() {
                *outcome = Some(AttemptOutcome::Failure(AttemptError::Transport(error)));
            }
        }
    }
}
