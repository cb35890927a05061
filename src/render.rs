//! Render thread: owns the matrix and processes commands via a channel.
//!
//! A matrix is single-writer and the native driver is not thread-safe, so
//! all matrix operations happen on one dedicated thread. The async HTTP
//! server talks to it by sending [`RenderCommand`] values through an `mpsc`
//! channel, and reads back a shared [`DisplayStatus`].
//!
//! ## Interrupt pattern
//! While a pattern is playing, `try_recv()` is checked between frames. A
//! brightness change is applied in place; any other command is stored in
//! `pending_cmd` and ends the playback so the main loop can run it.

use crate::backend::{self, BackendKind};
use crate::color::Color;
use crate::config::{HardwareConfig, RuntimeConfig};
use crate::driver::NativeDriver;
use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::matrix::Matrix;
use image::imageops::FilterType;
use image::{ImageReader, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// How often an idle render thread wakes to see whether the matrix was
/// closed from elsewhere.
const CLOSED_CHECK_INTERVAL: Duration = Duration::from_millis(50);

// ── Commands ─────────────────────────────────────────────────────────

/// Commands sent from the HTTP server to the render thread.
#[derive(Debug)]
pub enum RenderCommand {
    /// Display a static image, resized to the matrix
    ShowImage(PathBuf),
    /// Display a raw RGB24 frame (width*height*3 bytes)
    ShowFrame(Vec<u8>),
    /// Set every pixel to one color
    Fill(Color),
    /// Animate a built-in pattern until another command arrives
    PlayPattern { pattern: Pattern, fps: u32 },
    /// Render an all-black frame
    Clear,
    /// Stop the current pattern and go idle
    Stop,
    /// Set display brightness (0-100)
    SetBrightness(u8),
}

/// Built-in animations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Hue gradient across the columns, scrolling sideways
    Rainbow,
    /// Whole panel cycling through hues while fading in and out
    Pulse,
}

impl Pattern {
    /// Pixels for animation step `tick`, row-major.
    pub fn frame(self, geometry: Geometry, tick: u32) -> Vec<Color> {
        match self {
            Pattern::Rainbow => {
                let width = geometry.width.max(1);
                (0..geometry.pixel_count())
                    .map(|position| {
                        let (x, _) = geometry.coordinates(position);
                        let hue = ((x * 360 / width) as u32).wrapping_add(tick.wrapping_mul(4));
                        Color::from_hue((hue % 360) as u16)
                    })
                    .collect()
            }
            Pattern::Pulse => {
                let hue = ((tick / 2) % 360) as u16;
                // Triangle wave brightness: 0 → 100 → 0 over 200 ticks
                let cycle = tick % 200;
                let brightness = (if cycle < 100 { cycle } else { 200 - cycle }) as u8;
                let color = Color::from_hue(hue).apply_brightness(brightness);
                vec![color; geometry.pixel_count()]
            }
        }
    }
}

// ── Status ───────────────────────────────────────────────────────────

/// What the display is currently doing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    Idle,
    ShowingImage,
    ShowingFrame,
    Filled,
    PlayingPattern,
    Streaming,
    Closed,
}

/// Shared status that the HTTP server reads to report current state.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct DisplayStatus {
    /// Current display state
    pub state: DisplayState,
    /// Currently displayed media or pattern (if any)
    pub current_media: Option<String>,
    /// Active backend (`hardware`, `image-emulator`, `terminal-emulator`)
    pub backend: Option<String>,
    /// Matrix width in pixels
    pub width: usize,
    /// Matrix height in pixels
    pub height: usize,
    /// Current brightness (0-100, always 0 on emulators)
    pub brightness: u8,
    /// Frames rendered since start
    pub frames_rendered: u64,
    /// Server version
    pub version: String,
}

impl DisplayStatus {
    pub fn new() -> Self {
        Self {
            state: DisplayState::Idle,
            current_media: None,
            backend: None,
            width: 0,
            height: 0,
            brightness: 0,
            frames_rendered: 0,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn set_idle(&mut self) {
        self.state = DisplayState::Idle;
        self.current_media = None;
    }

    fn set_showing(&mut self, state: DisplayState, media: Option<String>) {
        self.state = state;
        self.current_media = media;
    }
}

impl Default for DisplayStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock the shared status, ignoring poisoning from a panicked handler.
pub fn lock_status(status: &Mutex<DisplayStatus>) -> MutexGuard<'_, DisplayStatus> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Helper functions ─────────────────────────────────────────────────

/// Load an image from disk and resize it to the matrix dimensions.
pub fn load_and_resize_image(path: &Path, geometry: Geometry) -> Result<RgbImage> {
    let img = ImageReader::open(path)?.decode()?;
    let resized = img
        .resize_exact(
            geometry.width as u32,
            geometry.height as u32,
            FilterType::Lanczos3,
        )
        .to_rgb8();
    Ok(resized)
}

/// Row-major colors of an image.
pub fn image_to_colors(img: &RgbImage) -> Vec<Color> {
    img.pixels().map(|pixel| Color::from(*pixel)).collect()
}

/// Colors of a raw RGB24 buffer. A trailing partial pixel is ignored.
pub fn frame_to_colors(data: &[u8]) -> Vec<Color> {
    data.chunks_exact(3)
        .map(|rgb| Color::new(rgb[0], rgb[1], rgb[2]))
        .collect()
}

/// Apply a full frame and account for it in the status. Returns false when
/// the matrix can no longer render.
fn present<M: Matrix>(matrix: &mut M, leds: &[Color], status: &Mutex<DisplayStatus>) -> bool {
    match matrix.apply(leds) {
        Ok(()) => {
            lock_status(status).frames_rendered += 1;
            true
        }
        Err(Error::Closed) => {
            tracing::info!("Matrix closed, stopping render");
            false
        }
        Err(e) => {
            tracing::error!("Render failed: {}", e);
            false
        }
    }
}

fn set_brightness<M: Matrix>(matrix: &mut M, status: &Mutex<DisplayStatus>, value: u8) {
    matrix.set_brightness(value.min(100));
    let brightness = matrix.brightness();
    lock_status(status).brightness = brightness;
    tracing::info!("Brightness set to {}", brightness);
}

// ── Render loop ──────────────────────────────────────────────────────

/// Process commands against `matrix` until the channel closes or the matrix
/// is closed from elsewhere (the terminal quit key). Closes the matrix on
/// the way out.
pub fn run_commands<M: Matrix>(
    matrix: &mut M,
    rx: Receiver<RenderCommand>,
    status: &Mutex<DisplayStatus>,
) {
    let geometry = matrix.geometry();
    {
        let mut s = lock_status(status);
        s.width = geometry.width;
        s.height = geometry.height;
        s.brightness = matrix.brightness();
    }

    // Pending command — set when a playback loop is interrupted
    let mut pending_cmd: Option<RenderCommand> = None;

    tracing::info!("Render thread started, waiting for commands...");

    loop {
        if matrix.is_closed() {
            tracing::info!("Matrix closed, stopping render thread");
            break;
        }

        let cmd = if let Some(cmd) = pending_cmd.take() {
            cmd
        } else {
            // The terminal quit key closes the matrix without sending anything
            match rx.recv_timeout(CLOSED_CHECK_INTERVAL) {
                Ok(cmd) => cmd,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("Render thread: channel closed, shutting down.");
                    break;
                }
            }
        };

        match cmd {
            RenderCommand::Clear => {
                if present(matrix, &[], status) {
                    lock_status(status).set_idle();
                }
            }

            RenderCommand::Stop => {
                lock_status(status).set_idle();
            }

            RenderCommand::SetBrightness(value) => set_brightness(matrix, status, value),

            RenderCommand::Fill(color) => {
                let leds = vec![color; geometry.pixel_count()];
                if present(matrix, &leds, status) {
                    let media = format!("#{:06x}", color.packed());
                    lock_status(status).set_showing(DisplayState::Filled, Some(media));
                }
            }

            RenderCommand::ShowImage(path) => {
                let path_str = path.display().to_string();
                match load_and_resize_image(&path, geometry) {
                    Ok(img) => {
                        if present(matrix, &image_to_colors(&img), status) {
                            lock_status(status)
                                .set_showing(DisplayState::ShowingImage, Some(path_str.clone()));
                            tracing::info!("Displaying image: {}", path_str);
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to load image {}: {}", path_str, e);
                        lock_status(status).set_idle();
                    }
                }
            }

            RenderCommand::ShowFrame(data) => {
                let expected = geometry.frame_byte_count();
                if data.len() == expected {
                    if present(matrix, &frame_to_colors(&data), status) {
                        let mut s = lock_status(status);
                        if s.state != DisplayState::Streaming {
                            s.set_showing(DisplayState::ShowingFrame, None);
                        }
                    }
                } else {
                    tracing::error!(
                        "Invalid frame size: expected {} bytes, got {}",
                        expected,
                        data.len()
                    );
                }
            }

            RenderCommand::PlayPattern { pattern, fps } => {
                let frame_duration = Duration::from_millis(1000 / fps.max(1) as u64);
                lock_status(status).set_showing(
                    DisplayState::PlayingPattern,
                    Some(format!("{pattern:?}").to_lowercase()),
                );
                tracing::info!("Playing pattern {:?} @ {} fps", pattern, fps);

                let mut tick: u32 = 0;

                'playback: loop {
                    // Check for new commands (non-blocking)
                    match rx.try_recv() {
                        Ok(RenderCommand::SetBrightness(value)) => {
                            set_brightness(matrix, status, value);
                        }
                        Ok(new_cmd) => {
                            pending_cmd = Some(new_cmd);
                            break 'playback;
                        }
                        Err(TryRecvError::Empty) => {}
                        Err(TryRecvError::Disconnected) => break 'playback,
                    }

                    if !present(matrix, &pattern.frame(geometry, tick), status) {
                        break 'playback;
                    }

                    tick = tick.wrapping_add(1);
                    thread::sleep(frame_duration);
                }
            }
        }
    }

    if let Err(e) = matrix.close() {
        tracing::error!("Failed to close matrix: {}", e);
    }
    lock_status(status).set_showing(DisplayState::Closed, None);
}

/// Render thread entry point: build the matrix for the configured backend,
/// report the outcome on `ready`, then run commands until shutdown.
///
/// The matrix is created on this thread because the native driver handle
/// must stay on the thread that opened it.
pub fn render_loop(
    rx: Receiver<RenderCommand>,
    status: Arc<Mutex<DisplayStatus>>,
    config: HardwareConfig,
    runtime: RuntimeConfig,
    ready: Sender<Result<Geometry>>,
) {
    let kind = BackendKind::from_env();
    let mut matrix = match backend::new_matrix_for::<NativeDriver>(kind, &config, &runtime) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to initialize LED matrix: {}", e);
            let _ = ready.send(Err(e));
            return;
        }
    };

    lock_status(&status).backend = Some(kind.to_string());
    let _ = ready.send(Ok(matrix.geometry()));
    run_commands(&mut matrix, rx, &status);
}
