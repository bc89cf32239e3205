//! Voice Relay
//!
//! The request pipeline behind the HTTP surface. `handle_voice` runs the three
//! provider stages strictly in order: transcribe, chat, synthesize. Each stage
//! only starts after its predecessor has returned, and the first failure ends
//! the request.

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::providers::{
    AssemblyAiClient, ChatModel, ElevenLabsClient, OpenRouterClient, SpeechSynthesizer,
    Transcriber, build_http_client,
};
use axum::http::Method;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Reply to `GET /`
pub const STATUS_MESSAGE: &str = "Ziya çalışıyor! GET başarılı.";

/// Greeting used by `POST /`; the caller's message is appended
pub const ECHO_PREFIX: &str = "Merhaba Murat! Sen şöyle dedin: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EchoReply {
    Status { message: String },
    Echo { response: String },
}

/// Successful `/voice` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceReply {
    /// Chat model reply that was spoken
    pub text: String,
    /// Synthesized speech, base64 (standard alphabet, padded)
    pub audio: String,
}

/// Health-check echo. Any method other than POST gets the status message.
///
/// A string `message` is echoed verbatim and any other JSON value in its
/// compact form. A missing field, or a body that is missing or not valid
/// JSON, echoes an empty message.
pub fn handle_echo(method: &Method, body: &[u8]) -> EchoReply {
    if *method != Method::POST {
        return EchoReply::Status {
            message: STATUS_MESSAGE.to_string(),
        };
    }

    let message = match serde_json::from_slice::<Value>(body) {
        Ok(request) => match request.get("message") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
        Err(_) => String::new(),
    };
    EchoReply::Echo {
        response: format!("{}{}", ECHO_PREFIX, message),
    }
}

#[derive(Clone)]
pub struct VoiceRelay {
    transcriber: Arc<dyn Transcriber>,
    chat: Arc<dyn ChatModel>,
    speech: Arc<dyn SpeechSynthesizer>,
}

impl VoiceRelay {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatModel>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            transcriber,
            chat,
            speech,
        }
    }

    /// Build the production relay. All three clients share one connection pool.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = build_http_client(&config.http)?;

        Ok(Self::new(
            Arc::new(AssemblyAiClient::new(client.clone(), &config.transcription)),
            Arc::new(OpenRouterClient::new(client.clone(), &config.chat)),
            Arc::new(ElevenLabsClient::new(client, &config.speech)),
        ))
    }

    /// Run one recording through transcription, chat and speech synthesis
    pub async fn handle_voice(&self, audio: Option<Vec<u8>>) -> Result<VoiceReply> {
        let audio = audio
            .filter(|bytes| !bytes.is_empty())
            .ok_or(RelayError::MissingAudio)?;

        let started = Instant::now();
        tracing::info!("Voice request: {} bytes of audio", audio.len());

        let transcript = self.transcriber.transcribe(audio).await?;
        tracing::debug!(
            "Transcript ready after {:?}: {}",
            started.elapsed(),
            transcript
        );

        let text = self.chat.reply(&transcript).await?;
        tracing::debug!("Chat reply ready after {:?}", started.elapsed());

        let speech = self.speech.synthesize(&text).await?;
        let audio = STANDARD.encode(&speech);

        tracing::info!(
            "Voice request done in {:?} ({} chars, {} audio bytes)",
            started.elapsed(),
            text.len(),
            speech.len()
        );

        Ok(VoiceReply { text, audio })
    }
}
