//! Error Types
//!
//! One variant per pipeline failure kind so each stage can be matched on and
//! tested independently.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The external stage a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Transcription,
    Chat,
    Speech,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Transcription => "transcription",
            Service::Chat => "chat",
            Service::Speech => "speech",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum RelayError {
    /// No usable audio in the request
    #[error("Ses dosyası bulunamadı!")]
    MissingAudio,

    /// The transcription provider reported the job as failed
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// The transcription job never reached a terminal state
    #[error("transcription did not finish after {attempts} polls ({elapsed:?})")]
    TranscriptionTimeout { attempts: u32, elapsed: Duration },

    #[error("no API key configured for {0} provider")]
    MissingApiKey(Service),

    #[error("{service} request failed: {source}")]
    Http {
        service: Service,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} API error ({status}): {body}")]
    Api {
        service: Service,
        status: u16,
        body: String,
    },

    #[error("malformed {service} response: {detail}")]
    MalformedResponse { service: Service, detail: String },
}

impl RelayError {
    /// Build a transport error tagged with its stage
    pub fn http(service: Service, source: reqwest::Error) -> Self {
        RelayError::Http { service, source }
    }

    pub fn malformed(service: Service, detail: impl Into<String>) -> Self {
        RelayError::MalformedResponse {
            service,
            detail: detail.into(),
        }
    }

    /// Stage the error belongs to, if any
    pub fn service(&self) -> Option<Service> {
        match self {
            RelayError::MissingAudio => None,
            RelayError::Transcription(_) | RelayError::TranscriptionTimeout { .. } => {
                Some(Service::Transcription)
            }
            RelayError::MissingApiKey(service)
            | RelayError::Http { service, .. }
            | RelayError::Api { service, .. }
            | RelayError::MalformedResponse { service, .. } => Some(*service),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
