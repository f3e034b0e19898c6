//! ChatRelay Core — error types, static configuration, credentials.

pub mod config;
pub mod error;

pub use config::{resolve_api_key, ApiConfig, ChatRelayConfig};
pub use error::{Error, Result};
