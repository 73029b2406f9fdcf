//! HTTP endpoints for Chromatune.
//!
//! One submit-for-generation endpoint and one audio retrieval endpoint.
//! Request validation happens here; the pipeline itself runs on a
//! blocking worker so it never stalls the event loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chromatune_compose::GenerationSettings;
use chromatune_render::AudioRenderer;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::ApiError;
use crate::pipeline;

/// Maximum accepted image payload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Shared state for web handlers.
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<dyn AudioRenderer>,
    pub audio_dir: PathBuf,
    pub start_time: Instant,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate_music))
        .route("/audio/{filename}", get(get_audio))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Success summary returned to the caller.
#[derive(Debug, Serialize, Deserialize)]
struct GenerateResponse {
    audio_url: String,
    bpm: u32,
    instruments: Vec<String>,
    duration: f64,
    waveform: Vec<f32>,
    hue_histogram: Vec<f32>,
}

#[tracing::instrument(name = "http.generate", skip(state, multipart))]
async fn generate_music(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, ApiError> {
    let mut image_bytes: Option<axum::body::Bytes> = None;
    let mut settings = GenerationSettings::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("malformed multipart body".to_string()))?
    {
        match field.name() {
            Some("image") => {
                match field.content_type() {
                    Some(ct) if ct.starts_with("image/") => {}
                    _ => return Err(ApiError::UnsupportedMediaType),
                }
                let data = field.bytes().await.map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        ApiError::PayloadTooLarge
                    } else {
                        ApiError::BadRequest("unreadable image field".to_string())
                    }
                })?;
                if data.len() > MAX_IMAGE_BYTES {
                    return Err(ApiError::PayloadTooLarge);
                }
                image_bytes = Some(data);
            }
            Some("settings") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("unreadable settings field".to_string()))?;
                settings = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("invalid settings: {e}")))?;
            }
            _ => {}
        }
    }

    let image = image_bytes
        .ok_or_else(|| ApiError::BadRequest("missing image field".to_string()))?;

    let request_id = Uuid::new_v4();
    let out_path = state.audio_dir.join(format!("{request_id}.wav"));
    tracing::info!(%request_id, bytes = image.len(), "starting music generation");

    let renderer = state.renderer.clone();
    let task_settings = settings.clone();
    let summary = tokio::task::spawn_blocking(move || {
        pipeline::generate(&image, &task_settings, renderer.as_ref(), &out_path)
    })
    .await
    .map_err(|e| {
        tracing::error!(%request_id, "generation task panicked: {e}");
        ApiError::Internal
    })?
    .map_err(|e| {
        tracing::error!(%request_id, error = %e, "music generation failed");
        ApiError::Internal
    })?;

    tracing::info!(%request_id, bpm = summary.bpm, "music generation complete");

    Ok(Json(GenerateResponse {
        audio_url: format!("/audio/{request_id}.wav"),
        bpm: summary.bpm,
        instruments: summary.instruments,
        duration: summary.duration,
        waveform: summary.waveform,
        hue_histogram: summary.hue_histogram,
    }))
}

#[derive(Debug, Deserialize)]
struct AudioQuery {
    #[serde(default)]
    download: bool,
}

#[tracing::instrument(name = "http.audio", skip(state))]
async fn get_audio(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<AudioQuery>,
) -> Result<Response, ApiError> {
    // Artifacts are flat files keyed by request id; any traversal shape
    // in the identifier is treated as absent.
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(ApiError::NotFound);
    }

    let path = state.audio_dir.join(&filename);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(ApiError::NotFound),
    }

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::NotFound)?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/wav");
    if query.download {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        );
    }
    builder.body(body).map_err(|e| {
        tracing::error!("failed to build audio response: {e}");
        ApiError::Internal
    })
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}
