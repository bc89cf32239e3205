//! AssemblyAI speech-to-text client.
//!
//! Transcription is a three-step exchange: upload the raw audio, submit a job
//! that references the upload, then poll the job until it is `completed` or
//! `error`. Polling follows a bounded [`PollPolicy`].

use super::{Transcriber, check_status, decode_json, endpoint, require_key};
use crate::config::TranscriptionConfig;
use crate::error::{RelayError, Result, Service};
use crate::utils::{PollError, PollPolicy, PollStatus};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the job status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
    /// Any status this client does not know; treated as still running
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// A transcription job as returned by `GET /transcript/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reason used when a failed job carries no error message
const JOB_FAILED: &str = "provider reported an error";

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    audio_url: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Clone)]
pub struct AssemblyAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    policy: PollPolicy,
}

impl AssemblyAiClient {
    pub fn new(client: Client, config: &TranscriptionConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            policy: config.poll_policy(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn key(&self) -> Result<&str> {
        require_key(Service::Transcription, &self.api_key)
    }

    /// Upload raw audio; returns the provider's upload URL
    pub async fn upload(&self, audio: Vec<u8>) -> Result<String> {
        let size = audio.len();
        let response = self
            .client
            .post(endpoint(&self.base_url, "upload"))
            .header("authorization", self.key()?)
            .header("content-type", "application/octet-stream")
            .body(audio)
            .send()
            .await
            .map_err(|e| RelayError::http(Service::Transcription, e))?;

        let response = check_status(Service::Transcription, response).await?;
        let upload: UploadResponse = decode_json(Service::Transcription, response).await?;

        tracing::debug!("AssemblyAI: uploaded {} bytes", size);
        Ok(upload.upload_url)
    }

    /// Submit a transcription job for an uploaded file; returns the job id
    pub async fn submit(&self, upload_url: &str) -> Result<String> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "transcript"))
            .header("authorization", self.key()?)
            .json(&SubmitRequest {
                audio_url: upload_url,
            })
            .send()
            .await
            .map_err(|e| RelayError::http(Service::Transcription, e))?;

        let response = check_status(Service::Transcription, response).await?;
        let submitted: SubmitResponse = decode_json(Service::Transcription, response).await?;

        tracing::debug!("AssemblyAI: submitted job {}", submitted.id);
        Ok(submitted.id)
    }

    pub async fn fetch_job(&self, id: &str) -> Result<TranscriptionJob> {
        let response = self
            .client
            .get(endpoint(&self.base_url, &format!("transcript/{}", id)))
            .header("authorization", self.key()?)
            .send()
            .await
            .map_err(|e| RelayError::http(Service::Transcription, e))?;

        let response = check_status(Service::Transcription, response).await?;
        decode_json(Service::Transcription, response).await
    }

    /// Poll a job until it reaches a terminal state or the policy runs out
    pub async fn wait_for_completion(&self, id: &str) -> Result<String> {
        let outcome = self
            .policy
            .poll_until::<String, RelayError, _, _>(|attempt| async move {
                let job = self.fetch_job(id).await?;
                tracing::debug!(
                    "AssemblyAI: job {} is {:?} (poll {})",
                    id,
                    job.status,
                    attempt
                );

                let status = match job.status {
                    JobStatus::Completed => PollStatus::Ready(job.text.unwrap_or_default()),
                    JobStatus::Error => {
                        let reason = job.error.unwrap_or_else(|| JOB_FAILED.to_string());
                        return Err(RelayError::Transcription(reason));
                    }
                    _ => PollStatus::Pending,
                };
                Ok(status)
            })
            .await;

        match outcome {
            Ok(text) => Ok(text),
            Err(PollError::Check(err)) => Err(err),
            Err(PollError::Exhausted { attempts, elapsed }) => {
                tracing::warn!(
                    "AssemblyAI: job {} still pending after {} polls ({:?})",
                    id,
                    attempts,
                    elapsed
                );
                Err(RelayError::TranscriptionTimeout { attempts, elapsed })
            }
        }
    }
}

#[async_trait]
impl Transcriber for AssemblyAiClient {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        let upload_url = self.upload(audio).await?;
        let job_id = self.submit(&upload_url).await?;
        let text = self.wait_for_completion(&job_id).await?;

        tracing::info!("AssemblyAI: transcribed {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    fn client_for(url: &str, max_attempts: u32) -> AssemblyAiClient {
        let config = TranscriptionConfig {
            api_key: Some("test-aai-key".to_string()),
            base_url: url.to_string(),
            ..TranscriptionConfig::default()
        };
        AssemblyAiClient::new(Client::new(), &config).with_policy(PollPolicy {
            interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            multiplier: 1.0,
            max_attempts,
            timeout: Duration::from_secs(10),
        })
    }

    #[test]
    fn test_job_parse_completed() {
        let json = r#"{"id": "t-1", "status": "completed", "text": "merhaba dünya"}"#;
        let job: TranscriptionJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.text.as_deref(), Some("merhaba dünya"));
        assert!(job.status.is_terminal());
    }

    #[test]
    fn test_job_parse_unknown_status_is_pending() {
        let json = r#"{"id": "t-1", "status": "transcoding", "text": null}"#;
        let job: TranscriptionJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
        assert!(!job.status.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[tokio::test]
    async fn test_transcribe_full_flow() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", "/upload")
            .match_header("authorization", "test-aai-key")
            .match_header("content-type", "application/octet-stream")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"upload_url": "https://cdn.example/audio-1"}"#)
            .create_async()
            .await;
        let submit = server
            .mock("POST", "/transcript")
            .match_header("authorization", "test-aai-key")
            .match_body(Matcher::Json(
                serde_json::json!({"audio_url": "https://cdn.example/audio-1"}),
            ))
            .with_status(200)
            .with_body(r#"{"id": "job-42", "status": "queued"}"#)
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/transcript/job-42")
            .match_header("authorization", "test-aai-key")
            .with_status(200)
            .with_body(r#"{"id": "job-42", "status": "completed", "text": "hello"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), 5);
        let text = client.transcribe(vec![1, 2, 3, 4]).await.unwrap();

        upload.assert_async().await;
        submit.assert_async().await;
        poll.assert_async().await;
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_wait_polls_until_completed() {
        let mut server = mockito::Server::new_async().await;
        let pending = server
            .mock("GET", "/transcript/job-1")
            .with_status(200)
            .with_body(r#"{"id": "job-1", "status": "processing"}"#)
            .expect(2)
            .create_async()
            .await;

        // matched only after `pending` has served its two hits
        let done = server
            .mock("GET", "/transcript/job-1")
            .with_status(200)
            .with_body(r#"{"id": "job-1", "status": "completed", "text": "tamam"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), 10);
        let text = client.wait_for_completion("job-1").await.unwrap();
        pending.assert_async().await;
        done.assert_async().await;
        assert_eq!(text, "tamam");
    }

    #[tokio::test]
    async fn test_wait_error_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/transcript/job-err")
            .with_status(200)
            .with_body(r#"{"id": "job-err", "status": "error", "error": "audio too short"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url(), 10);
        let result = client.wait_for_completion("job-err").await;

        mock.assert_async().await;
        match result {
            Err(RelayError::Transcription(msg)) => assert_eq!(msg, "audio too short"),
            other => panic!("expected transcription error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/transcript/job-slow")
            .with_status(200)
            .with_body(r#"{"id": "job-slow", "status": "queued"}"#)
            .expect(3)
            .create_async()
            .await;

        let client = client_for(&server.url(), 3);
        let result = client.wait_for_completion("job-slow").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(RelayError::TranscriptionTimeout { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_completed_without_text_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/transcript/job-silent")
            .with_status(200)
            .with_body(r#"{"id": "job-silent", "status": "completed", "text": null}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), 3);
        assert_eq!(client.wait_for_completion("job-silent").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_upload_api_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .with_status(401)
            .with_body(r#"{"error": "Authentication error, API token missing/invalid"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), 3);
        let result = client.transcribe(vec![0u8; 16]).await;

        mock.assert_async().await;
        match result {
            Err(RelayError::Api {
                service,
                status,
                ..
            }) => {
                assert_eq!(service, Service::Transcription);
                assert_eq!(status, 401);
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_missing_field_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload")
            .with_status(200)
            .with_body(r#"{"url": "wrong-field"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), 3);
        let result = client.upload(vec![0u8; 16]).await;
        assert!(matches!(
            result,
            Err(RelayError::MalformedResponse {
                service: Service::Transcription,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let config = TranscriptionConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..TranscriptionConfig::default()
        };
        let client = AssemblyAiClient::new(Client::new(), &config);
        let result = client.transcribe(vec![1]).await;
        assert!(matches!(
            result,
            Err(RelayError::MissingApiKey(Service::Transcription))
        ));
    }
}
