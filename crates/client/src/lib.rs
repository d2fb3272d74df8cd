pub mod batch;
pub mod engine;
pub mod http;
pub mod transport;
pub mod upload;

pub use backhaul_core;
pub use batch::{BatchError, UploadJob};
pub use engine::{AttemptError, SetupError, UploadError, UploadReceipt, Uploader};
pub use http::{HttpTransport, MimeResolver};
pub use transport::{ContentTypeResolver, StorageTransport, TransportError};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
