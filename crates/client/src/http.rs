//! Production collaborators: reqwest-backed transport and mime_guess
//! content-type resolution.

use std::path::Path;
use std::time::Duration;

use backhaul_core::{Headers, UploaderConfig};

use crate::transport::{
    put_channel, ContentTypeResolver, PutHandle, StorageTransport, TransportError,
};

/// HTTP transport performing `PUT` against the virtual-hosted bucket
/// endpoint (`https://{bucket}.s3.{region}.amazonaws.com/{key}`).
///
/// Credentials travel as an `Authorization` header; producing a real signed
/// request is out of scope here and belongs to a fronting signer or bucket
/// policy. One put maps to one request and one completion event.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    authorization: String,
}

impl HttpTransport {
    /// Build a transport with its own connection pool and request timeout.
    pub fn new(config: &UploaderConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Build from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, config: &UploaderConfig) -> Self {
        Self {
            client,
            endpoint: format!(
                "https://{}.s3.{}.amazonaws.com",
                config.bucket, config.region
            ),
            authorization: format!("AWS {}:{}", config.key, config.secret),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl StorageTransport for HttpTransport {
    fn put(&self, destination: &str, headers: &Headers, payload: &[u8]) -> PutHandle {
        let (sink, handle) = put_channel();

        let url = format!("{}/{}", self.endpoint, destination.trim_start_matches('/'));
        let mut request = self
            .client
            .put(url)
            .header("Authorization", &self.authorization);
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }
        let request = request.body(payload.to_vec());

        tokio::spawn(async move {
            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match response.bytes().await {
                        Ok(body) => sink.respond(status, body.to_vec()),
                        Err(e) => sink.fail(TransportError::new(format!(
                            "failed to read response body: {e}"
                        ))),
                    }
                }
                Err(e) => sink.fail(TransportError::new(e.to_string())),
            }
        });

        handle
    }
}

/// Content types inferred from the file extension via `mime_guess`;
/// unknown extensions fall back to `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeResolver;

impl ContentTypeResolver for MimeResolver {
    fn resolve(&self, path: &Path) -> String {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use backhaul_core::UploaderConfig;

    use super::{HttpTransport, MimeResolver};
    use crate::transport::ContentTypeResolver;

    #[test]
    fn endpoint_is_virtual_hosted() {
        let config = UploaderConfig::new("ak", "sk", "media");
        let transport =
            HttpTransport::with_client(reqwest::Client::new(), &config);
        assert_eq!(transport.endpoint(), "https://media.s3.us-west-2.amazonaws.com");
    }

    #[test]
    fn resolver_maps_known_extensions() {
        let resolver = MimeResolver;
        assert_eq!(resolver.resolve(Path::new("photo.png")), "image/png");
        assert_eq!(resolver.resolve(Path::new("notes.txt")), "text/plain");
    }

    #[test]
    fn resolver_falls_back_to_octet_stream() {
        let resolver = MimeResolver;
        assert_eq!(
            resolver.resolve(Path::new("blob.zzz-unknown")),
            "application/octet-stream"
        );
    }
}
