//! Provider Clients
//!
//! HTTP clients for the three external stages of the relay, each behind a
//! trait so the pipeline can be driven with substitutes:
//!
//! - speech-to-text via [`Transcriber`] (AssemblyAI upload, submit, poll)
//! - chat completion via [`ChatModel`] (OpenRouter)
//! - text-to-speech via [`SpeechSynthesizer`] (ElevenLabs)

pub mod chat;
pub mod speech;
pub mod transcription;

pub use chat::{ChatMessage, OpenRouterClient};
pub use speech::ElevenLabsClient;
pub use transcription::{AssemblyAiClient, JobStatus, TranscriptionJob};

use crate::config::{HttpConfig, usable_key};
use crate::error::{RelayError, Result, Service};
use crate::utils::truncate_str;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Longest provider error body kept in errors and logs
const MAX_ERROR_BODY: usize = 512;

/// Speech-to-text stage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Turn raw audio into text, waiting for the provider job to finish
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String>;
}

/// Chat completion stage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Reply to a transcript as the configured persona
    async fn reply(&self, transcript: &str) -> Result<String>;
}

/// Text-to-speech stage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Build the pooled HTTP client shared by all providers
pub fn build_http_client(config: &HttpConfig) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()?;
    Ok(client)
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub(crate) fn require_key(service: Service, key: &Option<String>) -> Result<&str> {
    usable_key(key).ok_or(RelayError::MissingApiKey(service))
}

/// Pass successful responses through; turn anything else into `RelayError::Api`
pub(crate) async fn check_status(service: Service, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RelayError::Api {
        service,
        status: status.as_u16(),
        body: truncate_str(&body, MAX_ERROR_BODY).to_string(),
    })
}

/// Read a JSON body, reporting missing fields as a malformed response
pub(crate) async fn decode_json<T: DeserializeOwned>(
    service: Service,
    response: Response,
) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| RelayError::http(service, e))?;

    serde_json::from_slice(&bytes).map_err(|e| RelayError::malformed(service, e.to_string()))
}
