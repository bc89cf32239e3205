//! OpenRouter chat completion client.
//!
//! Sends the persona as a system message followed by the transcript as the
//! user turn, and returns the first choice's content.

use super::{ChatModel, check_status, decode_json, endpoint, require_key};
use crate::config::ChatConfig;
use crate::error::{RelayError, Result, Service};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    persona: String,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    pub fn new(client: Client, config: &ChatConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            persona: config.persona.clone(),
            referer: config.referer.clone(),
            title: config.title.clone(),
        }
    }

    /// The two messages sent for one transcript
    pub fn exchange(&self, transcript: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.persona.as_str()),
            ChatMessage::user(transcript),
        ]
    }
}

#[async_trait]
impl ChatModel for OpenRouterClient {
    async fn reply(&self, transcript: &str) -> Result<String> {
        let api_key = require_key(Service::Chat, &self.api_key)?;
        let request = ChatRequest {
            model: &self.model,
            messages: self.exchange(transcript),
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::http(Service::Chat, e))?;

        let response = check_status(Service::Chat, response).await?;
        let completion: ChatResponse = decode_json(Service::Chat, response).await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::malformed(Service::Chat, "no choices in completion"))?
            .message
            .content
            .ok_or_else(|| RelayError::malformed(Service::Chat, "first choice has no content"))?;

        tracing::info!(
            "OpenRouter: {} replied with {} chars",
            self.model,
            content.len()
        );
        Ok(content)
    }
}
