//! HTTP API server
//!
//! axum router exposing the echo endpoint on `/` and the relay on `/voice`.

use crate::config::Config;
use crate::error::RelayError;
use crate::relay::{EchoReply, VoiceRelay, VoiceReply, handle_echo};
use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;
use uuid::Uuid;

/// Multipart field carrying the recording
pub const AUDIO_FIELD: &str = "audio";

const TRANSCRIPTION_FAILED: &str = "Ses tanıma hatası!";
const TRANSCRIPTION_TIMEOUT: &str = "Ses tanıma zaman aşımına uğradı!";
const INTERNAL_ERROR: &str = "Internal server error";

/// Shared handler state
pub struct AppState {
    pub relay: VoiceRelay,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::MissingAudio => error_response(StatusCode::BAD_REQUEST, self.to_string()),
            RelayError::Transcription(reason) => {
                tracing::warn!("Transcription failed: {}", reason);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, TRANSCRIPTION_FAILED)
            }
            RelayError::TranscriptionTimeout { .. } => {
                tracing::warn!("{}", self);
                error_response(StatusCode::GATEWAY_TIMEOUT, TRANSCRIPTION_TIMEOUT)
            }
            _ => {
                tracing::error!("Voice request failed: {}", self);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    // Browser clients call from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home).post(home))
        .route("/voice", post(voice))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// GET / and POST /
async fn home(method: Method, body: Bytes) -> Json<EchoReply> {
    Json(handle_echo(&method, &body))
}

/// POST /voice
async fn voice(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VoiceReply>, Response> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("voice", %request_id);

    async move {
        let audio = match multipart {
            Ok(multipart) => read_audio_field(multipart).await?,
            Err(rejection) => {
                tracing::debug!("Not a multipart request: {}", rejection);
                None
            }
        };

        state
            .relay
            .handle_voice(audio)
            .await
            .map(Json)
            .map_err(IntoResponse::into_response)
    }
    .instrument(span)
    .await
}

/// Pull the bytes of the `audio` field, skipping any other fields
async fn read_audio_field(mut multipart: Multipart) -> Result<Option<Vec<u8>>, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!("Invalid multipart body: {}", e.body_text());
                return Err(error_response(e.status(), e.body_text()));
            }
        };

        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        return match field.bytes().await {
            Ok(bytes) => Ok(Some(bytes.to_vec())),
            Err(e) => {
                tracing::warn!("Failed to read audio field: {}", e.body_text());
                Err(error_response(e.status(), e.body_text()))
            }
        };
    }
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let relay = VoiceRelay::from_config(config)?;
    let app = router(Arc::new(AppState { relay }), config.server.max_upload_bytes);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("voicerelay listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
