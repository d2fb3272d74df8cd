//! Batch upload coordinator.
//!
//! Fans out independent uploads and joins them into one batch outcome. The
//! first error settles the batch: in-flight siblings are aborted and the
//! error carries whatever receipts had completed by then. A batch-level
//! one-shot guard keeps late failures from settling the batch twice.

use std::path::PathBuf;

use backhaul_core::OnceGuard;
use tokio::task::JoinSet;
use tracing::debug;

use crate::engine::{UploadError, UploadReceipt, Uploader};

/// One source file and its destination key.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub src: PathBuf,
    pub dest: String,
}

impl UploadJob {
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
        }
    }
}

/// Terminal failure of a batch: the first upload error observed.
#[derive(Debug, thiserror::Error)]
#[error("upload of {src} (job {index}) failed: {source}", src = .job.src.display())]
pub struct BatchError {
    /// Input index of the failing job.
    pub index: usize,
    pub job: UploadJob,
    #[source]
    pub source: UploadError,
    /// Receipts of siblings that finished before the batch settled, at their
    /// original indices.
    pub completed: Vec<Option<UploadReceipt>>,
}

impl Uploader {
    /// Upload a set of files concurrently.
    ///
    /// Every job starts at once and none of them share mutable state; results
    /// are reported at their input index, whatever order completions arrive
    /// in. The first error wins and aborts the siblings still in flight —
    /// their slots stay empty in [`BatchError::completed`]. Callers that need
    /// the remainder pushed regardless can issue single
    /// [`upload`](Uploader::upload) calls instead.
    pub async fn upload_files(
        &self,
        jobs: Vec<UploadJob>,
    ) -> Result<Vec<UploadReceipt>, BatchError> {
        let mut completed: Vec<Option<UploadReceipt>> = Vec::new();
        completed.resize_with(jobs.len(), || None);

        let mut set = JoinSet::new();
        for (index, job) in jobs.into_iter().enumerate() {
            let uploader = self.clone();
            set.spawn(async move {
                let result = uploader.upload(&job.src, &job.dest).await;
                (index, job, result)
            });
        }

        let settled = OnceGuard::new();
        let mut first_error: Option<(usize, UploadJob, UploadError)> = None;

        while let Some(joined) = set.join_next().await {
            let (index, job, result) = match joined {
                Ok(output) => output,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => std::panic::resume_unwind(e.into_panic()),
            };
            match result {
                Ok(receipt) => {
                    debug!(index, dest = %job.dest, "batch member finished");
                    completed[index] = Some(receipt);
                }
                Err(error) => {
                    if settled.acquire() {
                        set.abort_all();
                        first_error = Some((index, job, error));
                    } else {
                        debug!(index, error = %error, "late failure after batch settled");
                    }
                }
            }
        }

        match first_error {
            Some((index, job, source)) => Err(BatchError {
                index,
                job,
                source,
                completed,
            }),
            None => Ok(completed.into_iter().flatten().collect()),
        }
    }
}
