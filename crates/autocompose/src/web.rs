//! Web endpoints for AutoCompose.
//!
//! A composition flows through here twice: once when `/api/generate/music`
//! (or `/api/render`) writes the per-instrument MIDI files, and again when
//! the browser fetches them back through `/api/download`.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path as StdPath, PathBuf};
use std::sync::Arc;

use composer::Composer;
use score::{generate_separate, InstrumentResult, MusicDescription, ScoreError};
use soundfonts::catalog::{Catalog, SoundfontInfo};

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub output_root: PathBuf,
    pub composer: Arc<dyn Composer>,
    pub catalog: Arc<Catalog>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_root))
        .route("/health", get(health))
        .route("/api/generate/music", post(generate_music))
        .route("/api/render", post(render_description))
        .route("/api/soundfonts", get(list_soundfonts))
        .route("/api/composition/{dir}", get(composition_manifest))
        .route("/api/download/{dir}/{file}", get(download_midi))
        .with_state(state)
}

/// Serve root discovery endpoint
async fn serve_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "AutoCompose",
        "version": env!("CARGO_PKG_VERSION"),
        "links": {
            "health": "/health",
            "generate": "/api/generate/music",
            "render": "/api/render",
            "soundfonts": "/api/soundfonts",
        }
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    prompt: String,
}

/// One written MIDI file in a composition response
#[derive(Serialize)]
struct TrackInfo {
    instrument_name: String,
    soundfont_name: String,
    file_path: String,
    track_count: u32,
    midi_data: String,
    download_url: String,
}

#[derive(Serialize)]
struct CompositionResponse {
    title: String,
    directory: Option<String>,
    tracks: Vec<TrackInfo>,
}

/// Generate a composition from a free-text prompt
///
/// Asks the composer for a music description, then writes one MIDI file per
/// instrument. The composer answering nonsense is its failure (502); the
/// description failing validation is reported as a bad request.
#[tracing::instrument(name = "http.generate.music", skip(state, request))]
async fn generate_music(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let description = match state.composer.compose(&request.prompt).await {
        Ok(description) => description,
        Err(e) => {
            tracing::warn!("composer failed: {e}");
            return (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };

    tracing::info!(
        title = %description.title,
        instruments = description.instruments.len(),
        "composed description"
    );
    write_composition(&state, &description)
}

/// Render a caller-supplied description, no model involved
#[tracing::instrument(name = "http.render", skip(state, description))]
async fn render_description(
    State(state): State<AppState>,
    Json(description): Json<MusicDescription>,
) -> Response {
    write_composition(&state, &description)
}

fn write_composition(state: &AppState, description: &MusicDescription) -> Response {
    match generate_separate(description, &state.output_root) {
        Ok(results) => {
            let directory = results
                .first()
                .and_then(|r| r.file_path.parent())
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned());
            let tracks = results
                .into_iter()
                .map(|r| track_info(r, directory.as_deref().unwrap_or_default()))
                .collect();
            let response = CompositionResponse {
                title: description.title.clone(),
                directory,
                tracks,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => score_error_response(e).into_response(),
    }
}

fn track_info(result: InstrumentResult, directory: &str) -> TrackInfo {
    let file_name = result
        .file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    TrackInfo {
        instrument_name: result.instrument_name,
        soundfont_name: result.soundfont_name,
        file_path: result.file_path.to_string_lossy().into_owned(),
        track_count: result.track_count,
        midi_data: result.midi_data,
        download_url: format!("/api/download/{directory}/{file_name}"),
    }
}

fn score_error_response(err: ScoreError) -> (StatusCode, Json<serde_json::Value>) {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("composition write failed: {err}");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(serde_json::json!({"error": err.to_string()})))
}

/// Download a written MIDI file
///
/// Falls back to a case-insensitive scan of the composition directory when
/// the exact name misses; browsers and players mangle case freely.
#[tracing::instrument(name = "http.download", skip(state))]
async fn download_midi(
    State(state): State<AppState>,
    Path((dir, file)): Path<(String, String)>,
) -> Response {
    if !is_safe_component(&dir) || !is_safe_component(&file) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "invalid path"})),
        )
            .into_response();
    }

    let composition_dir = state.output_root.join(&dir);
    let mut path = composition_dir.join(&file);
    if !path.is_file() {
        match find_case_insensitive(&composition_dir, &file) {
            Some(found) => path = found,
            None => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"error": "file not found"})),
                )
                    .into_response();
            }
        }
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "file not found"})),
            )
                .into_response();
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(file);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/midi")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
        .unwrap_or_else(|status| status.into_response())
}

/// A single path segment, no separators or parent references.
fn is_safe_component(component: &str) -> bool {
    !component.is_empty()
        && component != "."
        && component != ".."
        && !component.contains('/')
        && !component.contains('\\')
}

fn find_case_insensitive(dir: &StdPath, file: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().eq_ignore_ascii_case(file) {
            return Some(entry.path());
        }
    }
    None
}

/// One file in a composition manifest
#[derive(Serialize)]
struct CompositionFile {
    name: String,
    size_bytes: u64,
    midi_data: String,
}

/// Re-list an existing composition directory
#[tracing::instrument(name = "http.composition", skip(state))]
async fn composition_manifest(
    State(state): State<AppState>,
    Path(dir): Path<String>,
) -> impl IntoResponse {
    if !is_safe_component(&dir) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "invalid path"})),
        );
    }

    let composition_dir = state.output_root.join(&dir);
    let entries = match std::fs::read_dir(&composition_dir) {
        Ok(entries) => entries,
        Err(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "composition not found"})),
            );
        }
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_midi = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mid"));
        if !is_midi {
            continue;
        }
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        files.push(CompositionFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            size_bytes: bytes.len() as u64,
            midi_data: BASE64.encode(&bytes),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));

    (
        StatusCode::OK,
        Json(serde_json::json!({"directory": dir, "files": files})),
    )
}

#[derive(Debug, Deserialize)]
struct SoundfontQuery {
    query: Option<String>,
    instrument_type: Option<String>,
}

/// Search the soundfont catalog
#[tracing::instrument(name = "http.soundfonts", skip(state))]
async fn list_soundfonts(
    State(state): State<AppState>,
    Query(params): Query<SoundfontQuery>,
) -> impl IntoResponse {
    let mut entries: Vec<&SoundfontInfo> = match &params.query {
        Some(query) => state.catalog.find(query),
        None => state.catalog.all().iter().collect(),
    };
    if let Some(family) = &params.instrument_type {
        entries.retain(|e| e.family.eq_ignore_ascii_case(family));
    }

    let count = entries.len();
    Json(serde_json::json!({"soundfonts": entries, "count": count}))
}
