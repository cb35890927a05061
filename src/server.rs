//! HTTP API: axum router and request handlers.
//!
//! Handlers run on the tokio runtime and never touch the matrix. Each one
//! validates its request, then hands a [`RenderCommand`] to the render
//! thread over a bounded `std::sync::mpsc` channel and returns immediately.
//! When the queue is full the command is refused rather than queued, so a
//! client streaming faster than the panel refreshes loses frames instead of
//! growing memory.

use crate::color::Color;
use crate::geometry::Geometry;
use crate::media::{self, ImageEntry};
use crate::render::{DisplayState, DisplayStatus, Pattern, RenderCommand, lock_status};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Commands the render thread may have pending before new ones are refused.
pub const COMMAND_QUEUE_DEPTH: usize = 4;

/// Shared state handed to every handler. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub command_tx: SyncSender<RenderCommand>,
    /// Written by the render thread, read by handlers
    pub status: Arc<Mutex<DisplayStatus>>,
    /// Root directory holding `images/`
    pub media_dir: PathBuf,
    /// Geometry reported by the matrix once it was built
    pub geometry: Geometry,
}

impl AppState {
    fn send(&self, cmd: RenderCommand) -> Result<StatusCode, ApiError> {
        match self.command_tx.try_send(cmd) {
            Ok(()) => Ok(StatusCode::OK),
            Err(TrySendError::Full(_)) => Err(ApiError::Busy),
            Err(TrySendError::Disconnected(_)) => Err(ApiError::RenderThreadGone),
        }
    }
}

/// Failures reported to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path is outside the media directory")]
    OutsideMediaDir,

    #[error("Media directory not found")]
    MediaDirMissing,

    #[error("Expected {expected} bytes ({width}x{height}x3 RGB), got {actual} bytes")]
    FrameSize {
        expected: usize,
        width: usize,
        height: usize,
        actual: usize,
    },

    #[error("Brightness must be 0-100, got {0}")]
    Brightness(u8),

    #[error("Render queue is full")]
    Busy,

    #[error("Render thread gone")]
    RenderThreadGone,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::OutsideMediaDir | ApiError::FrameSize { .. } | ApiError::Brightness(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::MediaDirMissing | ApiError::RenderThreadGone => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (code, self.to_string()).into_response()
    }
}

// ── OpenAPI Documentation ────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(
        get_status,
        get_images,
        post_display_image,
        post_display_fill,
        post_display_pattern,
        post_display_clear,
        post_display_stop,
        post_brightness,
    ),
    components(schemas(
        DisplayStatus,
        DisplayState,
        ImageEntry,
        Pattern,
        Geometry,
        ImageRequest,
        FillRequest,
        PatternRequest,
        BrightnessRequest,
    )),
    tags(
        (name = "display", description = "Display control endpoints"),
        (name = "media", description = "Media discovery endpoints"),
        (name = "system", description = "System status endpoints"),
    ),
    info(
        title = "LED Grid API",
        version = env!("CARGO_PKG_VERSION"),
        description = "HTTP API for driving an addressable RGB pixel grid"
    )
)]
pub struct ApiDoc;

// ── Request types ────────────────────────────────────────────────────

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImageRequest {
    /// Path to image file relative to media directory
    #[schema(example = "images/test.png")]
    path: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct FillRequest {
    /// RGB color array [red, green, blue], each 0-255
    #[schema(value_type = Vec<u8>, example = "[255, 0, 0]")]
    color: (u8, u8, u8),
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PatternRequest {
    pattern: Pattern,
    /// Animation frames per second
    #[serde(default = "default_fps")]
    #[schema(example = 30, default = 30)]
    fps: u32,
}

fn default_fps() -> u32 {
    30
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BrightnessRequest {
    /// Brightness level (0-100)
    #[schema(example = 75, minimum = 0, maximum = 100)]
    value: u8,
}

// ── Router ───────────────────────────────────────────────────────────

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
                .config(
                    utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
                        .validator_url("none"),
                ),
        )
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/images", get(get_images))
        .route("/api/v1/display/image", post(post_display_image))
        .route("/api/v1/display/frame", post(post_display_frame))
        .route("/api/v1/display/stream", get(ws_display_stream))
        .route("/api/v1/display/fill", post(post_display_fill))
        .route("/api/v1/display/pattern", post(post_display_pattern))
        .route("/api/v1/display/clear", post(post_display_clear))
        .route("/api/v1/display/stop", post(post_display_stop))
        .route("/api/v1/brightness", post(post_brightness))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────────

/// GET /api/v1/status
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "system",
    responses(
        (status = 200, description = "Current display status", body = DisplayStatus)
    )
)]
async fn get_status(State(state): State<AppState>) -> Json<DisplayStatus> {
    Json(lock_status(&state.status).clone())
}

/// GET /api/v1/images
#[utoipa::path(
    get,
    path = "/api/v1/images",
    tag = "media",
    responses(
        (status = 200, description = "Images the display can decode", body = Vec<ImageEntry>)
    )
)]
async fn get_images(State(state): State<AppState>) -> Json<Vec<ImageEntry>> {
    Json(media::list_images(&state.media_dir))
}

/// POST /api/v1/display/image
#[utoipa::path(
    post,
    path = "/api/v1/display/image",
    tag = "display",
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Image queued for display"),
        (status = 404, description = "Image not found"),
        (status = 400, description = "Path outside the media directory")
    )
)]
async fn post_display_image(
    State(state): State<AppState>,
    Json(req): Json<ImageRequest>,
) -> Result<StatusCode, ApiError> {
    let full_path = validate_media_path(&state.media_dir, &req.path)?;
    state.send(RenderCommand::ShowImage(full_path))
}

/// POST /api/v1/display/frame
///
/// Body is `application/octet-stream` with exactly width*height*3 bytes.
async fn post_display_frame(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    check_frame_size(state.geometry, body.len())?;
    state.send(RenderCommand::ShowFrame(body.to_vec()))
}

/// POST /api/v1/display/fill
#[utoipa::path(
    post,
    path = "/api/v1/display/fill",
    tag = "display",
    request_body = FillRequest,
    responses(
        (status = 200, description = "Fill queued"),
    )
)]
async fn post_display_fill(
    State(state): State<AppState>,
    Json(req): Json<FillRequest>,
) -> Result<StatusCode, ApiError> {
    let (r, g, b) = req.color;
    state.send(RenderCommand::Fill(Color::new(r, g, b)))
}

/// POST /api/v1/display/pattern
#[utoipa::path(
    post,
    path = "/api/v1/display/pattern",
    tag = "display",
    request_body = PatternRequest,
    responses(
        (status = 200, description = "Pattern started"),
    )
)]
async fn post_display_pattern(
    State(state): State<AppState>,
    Json(req): Json<PatternRequest>,
) -> Result<StatusCode, ApiError> {
    state.send(RenderCommand::PlayPattern {
        pattern: req.pattern,
        fps: req.fps,
    })
}

/// POST /api/v1/display/clear
#[utoipa::path(
    post,
    path = "/api/v1/display/clear",
    tag = "display",
    responses(
        (status = 200, description = "Display cleared"),
    )
)]
async fn post_display_clear(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.send(RenderCommand::Clear)
}

/// POST /api/v1/display/stop
#[utoipa::path(
    post,
    path = "/api/v1/display/stop",
    tag = "display",
    responses(
        (status = 200, description = "Pattern stopped"),
    )
)]
async fn post_display_stop(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.send(RenderCommand::Stop)
}

/// POST /api/v1/brightness
#[utoipa::path(
    post,
    path = "/api/v1/brightness",
    tag = "display",
    request_body = BrightnessRequest,
    responses(
        (status = 200, description = "Brightness updated"),
        (status = 400, description = "Value above 100")
    )
)]
async fn post_brightness(
    State(state): State<AppState>,
    Json(req): Json<BrightnessRequest>,
) -> Result<StatusCode, ApiError> {
    if req.value > 100 {
        return Err(ApiError::Brightness(req.value));
    }
    state.send(RenderCommand::SetBrightness(req.value))
}

// ── WebSocket streaming ─────────────────────────────────────────────

/// GET /api/v1/display/stream
///
/// Binary messages of exactly width*height*3 bytes are rendered as frames.
/// Wrong-sized frames are skipped, text is ignored. Status reads
/// `streaming` while a client is connected.
async fn ws_display_stream(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stream_socket(socket, state))
}

async fn handle_stream_socket(mut socket: WebSocket, state: AppState) {
    tracing::info!("WebSocket stream client connected");
    {
        let mut s = lock_status(&state.status);
        s.state = DisplayState::Streaming;
        s.current_media = Some("websocket".to_string());
    }

    let mut frame_count: u64 = 0;
    let mut dropped: u64 = 0;

    while let Some(msg) = socket.recv().await {
        let data = match msg {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("WebSocket receive error: {}", e);
                break;
            }
        };

        if let Err(e) = check_frame_size(state.geometry, data.len()) {
            tracing::warn!("WebSocket frame skipped: {}", e);
            continue;
        }
        match state.send(RenderCommand::ShowFrame(data.to_vec())) {
            Ok(_) => frame_count += 1,
            Err(ApiError::Busy) => dropped += 1,
            Err(_) => {
                tracing::error!("Render thread gone, closing WebSocket");
                break;
            }
        }
    }

    tracing::info!(
        "WebSocket stream client disconnected ({} frames rendered, {} dropped)",
        frame_count,
        dropped
    );
    let mut s = lock_status(&state.status);
    if s.state == DisplayState::Streaming {
        s.set_idle();
    }
}

// ── Validation ───────────────────────────────────────────────────────

fn check_frame_size(geometry: Geometry, actual: usize) -> Result<(), ApiError> {
    let expected = geometry.frame_byte_count();
    if actual == expected {
        Ok(())
    } else {
        Err(ApiError::FrameSize {
            expected,
            width: geometry.width,
            height: geometry.height,
            actual,
        })
    }
}

/// Resolve `relative_path` under `media_dir`, rejecting anything that
/// canonicalizes to a location outside it (e.g. `../../etc/passwd`).
fn validate_media_path(media_dir: &Path, relative_path: &str) -> Result<PathBuf, ApiError> {
    let canonical = media_dir
        .join(relative_path)
        .canonicalize()
        .map_err(|_| ApiError::NotFound(relative_path.to_string()))?;
    let canonical_media = media_dir
        .canonicalize()
        .map_err(|_| ApiError::MediaDirMissing)?;

    if !canonical.starts_with(&canonical_media) {
        return Err(ApiError::OutsideMediaDir);
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::mpsc::{self, Receiver};
    use tempfile::TempDir;

    fn state(media_dir: &Path) -> (AppState, Receiver<RenderCommand>) {
        let (tx, rx) = mpsc::sync_channel(COMMAND_QUEUE_DEPTH);
        let state = AppState {
            command_tx: tx,
            status: Arc::new(Mutex::new(DisplayStatus::new())),
            media_dir: media_dir.to_path_buf(),
            geometry: Geometry::new(2, 2),
        };
        (state, rx)
    }

    #[tokio::test]
    async fn frame_of_correct_size_is_forwarded() {
        let tmp = TempDir::new().unwrap();
        let (state, rx) = state(tmp.path());

        let code = post_display_frame(State(state), Bytes::from(vec![7u8; 12]))
            .await
            .unwrap();

        assert_eq!(code, StatusCode::OK);
        assert!(matches!(rx.try_recv(), Ok(RenderCommand::ShowFrame(data)) if data.len() == 12));
    }

    #[tokio::test]
    async fn frame_of_wrong_size_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let (state, rx) = state(tmp.path());

        let err = post_display_frame(State(state), Bytes::from(vec![0u8; 5]))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Expected 12 bytes (2x2x3 RGB), got 5 bytes"
        );
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn fill_sends_color() {
        let tmp = TempDir::new().unwrap();
        let (state, rx) = state(tmp.path());

        post_display_fill(State(state), Json(FillRequest { color: (1, 2, 3) }))
            .await
            .unwrap();

        assert!(matches!(
            rx.try_recv(),
            Ok(RenderCommand::Fill(c)) if c == Color::new(1, 2, 3)
        ));
    }

    #[tokio::test]
    async fn brightness_above_100_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let (state, rx) = state(tmp.path());

        let err = post_brightness(State(state.clone()), Json(BrightnessRequest { value: 150 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Brightness(150)));

        post_brightness(State(state), Json(BrightnessRequest { value: 40 }))
            .await
            .unwrap();
        assert!(matches!(rx.try_recv(), Ok(RenderCommand::SetBrightness(40))));
    }

    #[tokio::test]
    async fn send_fails_when_render_thread_is_gone() {
        let tmp = TempDir::new().unwrap();
        let (state, rx) = state(tmp.path());
        drop(rx);

        let err = post_display_clear(State(state)).await.unwrap_err();
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn full_queue_refuses_instead_of_growing() {
        let tmp = TempDir::new().unwrap();
        let (state, rx) = state(tmp.path());

        for _ in 0..COMMAND_QUEUE_DEPTH {
            post_display_frame(State(state.clone()), Bytes::from(vec![0u8; 12]))
                .await
                .unwrap();
        }
        let err = post_display_frame(State(state.clone()), Bytes::from(vec![0u8; 12]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Busy));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        // Draining one slot makes room again
        rx.recv().unwrap();
        post_display_clear(State(state)).await.unwrap();
        assert_eq!(rx.try_iter().count(), COMMAND_QUEUE_DEPTH);
    }

    #[tokio::test]
    async fn status_reflects_shared_state() {
        let tmp = TempDir::new().unwrap();
        let (state, _rx) = state(tmp.path());
        lock_status(&state.status).frames_rendered = 9;

        let Json(status) = get_status(State(state)).await;
        assert_eq!(status.frames_rendered, 9);
        assert_eq!(status.state, DisplayState::Idle);
    }

    #[test]
    fn media_path_inside_is_accepted() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("images")).unwrap();
        fs::write(tmp.path().join("images/a.png"), b"x").unwrap();

        let path = validate_media_path(tmp.path(), "images/a.png").unwrap();
        assert!(path.ends_with("images/a.png"));
    }

    #[test]
    fn media_path_traversal_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let media = tmp.path().join("media");
        fs::create_dir(&media).unwrap();
        fs::write(tmp.path().join("secret.png"), b"x").unwrap();

        let err = validate_media_path(&media, "../secret.png").unwrap_err();
        assert!(matches!(err, ApiError::OutsideMediaDir));
    }

    #[test]
    fn missing_media_path_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = validate_media_path(tmp.path(), "images/none.png").unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn openapi_lists_display_routes() {
        let doc = ApiDoc::openapi();
        for route in ["/api/v1/display/fill", "/api/v1/display/pattern", "/api/v1/brightness"] {
            assert!(doc.paths.paths.contains_key(route), "{route} missing");
        }
    }
}
