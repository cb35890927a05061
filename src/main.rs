//! LED grid HTTP API server.
//!
//! Builds a matrix for whichever backend the environment selects and
//! exposes it over HTTP so any device on the LAN can push images, frames,
//! fills, or patterns.
//!
//! ## Architecture
//! - **Render thread** (std::thread): owns the matrix, processes commands
//! - **HTTP server** (tokio/axum): accepts API requests, sends commands via channel
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/led-grid --media-dir /srv/media --rows 32 --cols 64
//! MATRIX_EMULATOR=1 MATRIX_EMULATOR_SNAPSHOT=/tmp/grid.png led-grid
//! ```

use clap::Parser;
use led_grid::config::Settings;
use led_grid::render::{DisplayStatus, render_loop};
use led_grid::server::{self, AppState};
use led_grid::{BackendKind, HardwareConfig, RuntimeConfig};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, mpsc};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// LED grid HTTP API server
#[derive(Parser)]
#[command(name = "led-grid")]
#[command(about = "HTTP API server for an addressable RGB pixel grid")]
#[command(version)]
struct Args {
    /// Root directory containing an images/ subdirectory
    #[arg(long, default_value = ".")]
    media_dir: PathBuf,

    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// JSON file with hardware and runtime settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append logs to this file. Without it logs go to stderr, or nowhere
    /// when the terminal emulator owns the screen.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Rows per panel
    #[arg(long)]
    rows: Option<usize>,

    /// Columns per panel
    #[arg(long)]
    cols: Option<usize>,

    /// Panels daisy-chained on one output
    #[arg(long)]
    chain_length: Option<usize>,

    /// Parallel output chains
    #[arg(long)]
    parallel: Option<usize>,

    /// GPIO mapping name (e.g. "regular", "adafruit-hat")
    #[arg(long)]
    gpio_mapping: Option<String>,

    /// Pixel mapper chain (e.g. "U-mapper")
    #[arg(long)]
    pixel_mapper: Option<String>,

    /// Initial brightness (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    brightness: Option<u8>,

    /// GPIO slowdown for faster Pi models
    #[arg(long)]
    gpio_slowdown: Option<u32>,
}

impl Args {
    /// Settings file (if any) with command-line overrides applied.
    fn settings(&self) -> led_grid::Result<(HardwareConfig, RuntimeConfig)> {
        let Settings {
            mut hardware,
            mut runtime,
        } = match &self.config {
            Some(path) => Settings::from_json_file(path)?,
            None => Settings::default(),
        };

        if let Some(rows) = self.rows {
            hardware.rows = rows;
        }
        if let Some(cols) = self.cols {
            hardware.cols = cols;
        }
        if let Some(chain_length) = self.chain_length {
            hardware.chain_length = chain_length;
        }
        if let Some(parallel) = self.parallel {
            hardware.parallel = parallel;
        }
        if let Some(mapping) = &self.gpio_mapping {
            hardware.gpio_mapping = mapping.clone();
        }
        if let Some(mapper) = &self.pixel_mapper {
            hardware.pixel_mapper_config = mapper.clone();
        }
        if let Some(brightness) = self.brightness {
            hardware.brightness = brightness;
        }
        if let Some(slowdown) = self.gpio_slowdown {
            runtime.gpio_slowdown = slowdown;
        }
        Ok((hardware, runtime))
    }
}

fn log_writer(kind: BackendKind, log_file: Option<&Path>) -> std::io::Result<BoxMakeWriter> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
        // stderr shares the tty with the terminal emulator's frame
        None if kind == BackendKind::TerminalEmulator => Ok(BoxMakeWriter::new(std::io::sink)),
        None => Ok(BoxMakeWriter::new(std::io::stderr)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let writer = match log_writer(BackendKind::from_env(), args.log_file.as_deref()) {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Cannot open log file: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .init();
    let (hardware, runtime) = match args.settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let media_dir = args.media_dir.canonicalize().unwrap_or_else(|_| {
        tracing::warn!("Could not canonicalize media dir, using as-is");
        args.media_dir.clone()
    });

    tracing::info!("LED grid HTTP server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Media dir: {}", media_dir.display());

    let (tx, rx) = mpsc::sync_channel(server::COMMAND_QUEUE_DEPTH);
    let (ready_tx, ready_rx) = mpsc::channel();
    let status = Arc::new(Mutex::new(DisplayStatus::new()));

    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    let render_status = status.clone();
    let render_handle = std::thread::spawn(move || {
        render_loop(rx, render_status, hardware, runtime, ready_tx);
        let _ = done_tx.send(());
    });

    let geometry = match ready_rx.recv() {
        Ok(Ok(geometry)) => geometry,
        Ok(Err(e)) => {
            tracing::error!("Matrix unavailable: {}", e);
            let _ = render_handle.join();
            return ExitCode::FAILURE;
        }
        Err(_) => {
            tracing::error!("Render thread exited before reporting");
            let _ = render_handle.join();
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Grid: {}x{}", geometry.width, geometry.height);

    let app = server::create_router(AppState {
        command_tx: tx,
        status,
        media_dir,
        geometry,
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            drop(app);
            let _ = render_handle.join();
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API Documentation: http://localhost:{}/docs", args.port);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
                _ = done_rx => tracing::info!("Render thread stopped, shutting down"),
            }
        })
        .await;

    // The router owned the command sender; dropping it ends the render loop.
    if render_handle.join().is_err() {
        tracing::error!("Render thread panicked");
        return ExitCode::FAILURE;
    }

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn log_file_is_used_even_for_terminal_backend() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("led-grid.log");

        let writer = log_writer(BackendKind::TerminalEmulator, Some(&path)).unwrap();
        writer.make_writer().write_all(b"ready\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ready\n");
    }

    #[test]
    fn unwritable_log_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing").join("led-grid.log");
        assert!(log_writer(BackendKind::Hardware, Some(&path)).is_err());
    }

    #[test]
    fn flags_override_settings_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"hardware": {"rows": 64, "cols": 64}}"#).unwrap();

        let args = Args::try_parse_from([
            "led-grid",
            "--config",
            path.to_str().unwrap(),
            "--cols",
            "128",
            "--gpio-slowdown",
            "4",
        ])
        .unwrap();
        let (hardware, runtime) = args.settings().unwrap();

        assert_eq!((hardware.rows, hardware.cols), (64, 128));
        assert_eq!(runtime.gpio_slowdown, 4);
    }
}
