//! Configuration Module
//!
//! Layered configuration: defaults, TOML files, then environment variables.
//! Built once at startup and handed to the relay and server.

mod types;

pub use types::{
    ChatConfig, Config, DEFAULT_PERSONA, HttpConfig, LoggingConfig, ServerConfig, SpeechConfig,
    TranscriptionConfig,
};
pub(crate) use types::usable_key;
