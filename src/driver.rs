//! Boundary to the native LED panel driver.
//!
//! The driver owns the panel handle and one offscreen canvas. It is created
//! from translated option records, destroyed on drop, and otherwise only
//! asked to push a packed frame and swap on vsync.
//!
//! With the `hardware` feature this is [`RpiDriver`] over `rpi-led-matrix`.
//! Without it, [`NoDriver`] refuses to open so a missing driver is a
//! construction error, never a silent fallback.

use crate::error::{Error, Result};
use crate::options::{DriverOptions, DriverRuntimeOptions};

#[cfg(feature = "hardware")]
mod rpi;

#[cfg(feature = "hardware")]
pub use rpi::RpiDriver;

/// The driver compiled into this build.
#[cfg(feature = "hardware")]
pub type NativeDriver = RpiDriver;

/// The driver compiled into this build.
#[cfg(not(feature = "hardware"))]
pub type NativeDriver = NoDriver;

pub trait Driver: Sized {
    /// Create the panel handle and its offscreen canvas.
    ///
    /// `options` is only borrowed for this call. May panic if the native
    /// library aborts on a bad topology; the caller contains that.
    fn open(options: &DriverOptions, runtime: &DriverRuntimeOptions) -> Result<Self>;

    /// Size of the offscreen canvas as reported by the driver. This is the
    /// authoritative geometry once pixel mappers are applied.
    fn canvas_size(&self) -> (usize, usize);

    /// Copy `pixels` (packed, row-major, `width * height` long) onto the
    /// offscreen canvas and swap it in on the next vsync. Blocks until the
    /// panel has taken the frame.
    fn swap(&mut self, width: usize, height: usize, pixels: &[u32]);

    fn brightness(&self) -> u8;

    fn set_brightness(&mut self, brightness: u8);
}

/// Stand-in used when the crate is built without a native driver.
#[derive(Debug)]
pub enum NoDriver {}

impl Driver for NoDriver {
    fn open(_options: &DriverOptions, _runtime: &DriverRuntimeOptions) -> Result<Self> {
        Err(Error::DriverUnavailable)
    }

    fn canvas_size(&self) -> (usize, usize) {
        match *self {}
    }

    fn swap(&mut self, _width: usize, _height: usize, _pixels: &[u32]) {
        match *self {}
    }

    fn brightness(&self) -> u8 {
        match *self {}
    }

    fn set_brightness(&mut self, _brightness: u8) {
        match *self {}
    }
}
