//! Addressable RGB pixel grid with interchangeable backends.
//!
//! Clients build a [`HardwareConfig`] and [`RuntimeConfig`], call
//! [`new_matrix`] to get a [`Matrix`], then repeatedly `set` pixels and
//! `render`. Which backend answers is decided by the environment:
//! - a real LED panel chain through the native driver (feature `hardware`)
//! - an in-process image emulator (`MATRIX_EMULATOR=1`)
//! - a terminal emulator (`MATRIX_TERMINAL_EMULATOR=1`)
//!
//! It also hosts the render thread, HTTP API, and media helpers used by the
//! `led-grid` binary.

pub mod backend;
pub mod color;
pub mod config;
pub mod driver;
pub mod emulator;
pub mod error;
pub mod geometry;
pub mod hardware;
pub mod matrix;
pub mod media;
pub mod options;
pub mod render;
pub mod server;
pub mod terminal;

#[cfg(test)]
mod testing;

pub use backend::{AnyMatrix, BackendKind, new_matrix, new_matrix_for};
pub use color::{Color, ColorModel, pack, unpack};
pub use config::{HardwareConfig, RuntimeConfig, ScanMode};
pub use error::{Error, Result};
pub use geometry::Geometry;
pub use matrix::Matrix;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set up a Ctrl+C handler that sets `running` to false.
///
/// The flag is shared between the main loop and the signal handler, so it
/// lives in an `Arc<AtomicBool>`.
pub fn setup_signal_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    Ok(running)
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_running_reads_flag() {
        let running = AtomicBool::new(true);
        assert!(is_running(&running));
        running.store(false, Ordering::SeqCst);
        assert!(!is_running(&running));
    }
}
