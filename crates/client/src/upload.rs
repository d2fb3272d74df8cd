//! File-to-buffer adapter: read a local file and hand it to the retry engine.

use std::path::Path;

use backhaul_core::headers::{CONTENT_LENGTH, CONTENT_TYPE};
use backhaul_core::Headers;

use crate::engine::{UploadError, UploadReceipt, Uploader};
use crate::transport::ContentTypeResolver as _;

impl Uploader {
    /// Upload the file at `source_path` to `destination`.
    ///
    /// The file is read fully into memory first. Read failures are local and
    /// final: they are reported without touching the network and are never
    /// retried. On success the content type comes from the source extension
    /// and `Content-Length` from the byte length, then the retry engine takes
    /// over.
    pub async fn upload(
        &self,
        source_path: impl AsRef<Path>,
        destination: &str,
    ) -> Result<UploadReceipt, UploadError> {
        let source_path = source_path.as_ref();
        let payload =
            tokio::fs::read(source_path)
                .await
                .map_err(|source| UploadError::Source {
                    path: source_path.to_path_buf(),
                    source,
                })?;

        let headers = Headers::new()
            .with(CONTENT_TYPE, self.resolver.resolve(source_path))
            .with(CONTENT_LENGTH, payload.len().to_string());

        self.upload_with_retries(&payload, headers, destination).await
    }
}
