//! Error types for matrix construction and rendering.

use std::ffi::NulError;
use std::io;
use thiserror::Error;

/// Matrix error type
#[derive(Error, Debug)]
pub enum Error {
    /// The native driver (or its offscreen canvas) could not be created
    #[error("unable to allocate matrix: {0}")]
    Allocation(String),

    /// The native layer panicked while the matrix was being constructed
    #[error("error creating matrix: {0}")]
    Construction(String),

    /// Built without a native driver and no emulator was requested
    #[error(
        "no LED driver available (build with --features hardware, \
         or set MATRIX_EMULATOR=1 / MATRIX_TERMINAL_EMULATOR=1)"
    )]
    DriverUnavailable,

    /// A string option cannot cross the driver boundary
    #[error("invalid {field} option: {source}")]
    InvalidOption {
        field: &'static str,
        #[source]
        source: NulError,
    },

    /// The matrix was already closed
    #[error("matrix is closed")]
    Closed,

    /// I/O error (terminal setup, snapshot writes, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Image decode or encode error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Malformed configuration file
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for matrix operations
pub type Result<T> = std::result::Result<T, Error>;
