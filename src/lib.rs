//! voicerelay - Spoken Conversation Relay
//!
//! A small HTTP backend that turns a voice recording into a spoken reply by
//! chaining three hosted services:
//!
//! 1. **Speech-to-text:** AssemblyAI (upload, submit job, poll until done)
//! 2. **Chat completion:** OpenRouter, answering as a fixed persona
//! 3. **Text-to-speech:** ElevenLabs
//!
//! ## Quick Start
//!
//! ```bash
//! export ASSEMBLYAI_KEY=... OPENROUTER_KEY=... ELEVENLABS_KEY=...
//! voicerelay serve --port 5000
//!
//! curl -F audio=@hello.webm http://localhost:5000/voice
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod relay;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use error::{RelayError, Service};
pub use relay::{VoiceRelay, VoiceReply};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
