pub mod backoff;
pub mod config;
pub mod guard;
pub mod headers;

pub use config::{ConfigError, UploaderConfig};
pub use guard::OnceGuard;
pub use headers::Headers;
