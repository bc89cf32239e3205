//! ElevenLabs text-to-speech client.

use super::{SpeechSynthesizer, check_status, endpoint, require_key};
use crate::config::SpeechConfig;
use crate::error::{RelayError, Result, Service};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsClient {
    pub fn new(client: Client, config: &SpeechConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    /// Returns the encoded audio exactly as the provider sent it
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let api_key = require_key(Service::Speech, &self.api_key)?;

        let response = self
            .client
            .post(endpoint(
                &self.base_url,
                &format!("text-to-speech/{}", self.voice_id),
            ))
            .header("xi-api-key", api_key)
            .json(&SpeechRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| RelayError::http(Service::Speech, e))?;

        let response = check_status(Service::Speech, response).await?;
        let audio_bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::http(Service::Speech, e))?
            .to_vec();

        tracing::info!(
            "ElevenLabs TTS: generated {} bytes of audio (voice={}, model={})",
            audio_bytes.len(),
            self.voice_id,
            self.model_id,
        );

        Ok(audio_bytes)
    }
}
