//! The backend-agnostic pixel grid contract.
//!
//! A client computes colors for positions `0..width*height` (row-major),
//! writes them with [`Matrix::set`], and publishes the frame with
//! [`Matrix::render`]. Every render starts the next frame from black.
//!
//! A matrix is single-writer: `set`, `render` and `close` all take
//! `&mut self`, so a frame cannot be closed while it is being rendered.
//! Producers on several threads must funnel through one owner (see
//! [`crate::render`]).

use crate::color::{Color, ColorModel};
use crate::error::Result;
use crate::geometry::Geometry;

pub trait Matrix {
    /// Size of the grid. Stable for the lifetime of the matrix.
    fn geometry(&self) -> Geometry;

    /// Write one pixel of the frame under construction. Any color model is
    /// accepted; it is reduced to 8 bits per channel, and an absent color
    /// (`None`) is black.
    ///
    /// # Panics
    /// If `position >= width * height`.
    fn set(&mut self, position: usize, color: &dyn ColorModel);

    /// Read back a pixel written since the last render. Black if unset.
    ///
    /// # Panics
    /// If `position >= width * height`.
    fn at(&self, position: usize) -> Color;

    /// Publish the current frame and start a fresh black one.
    fn render(&mut self) -> Result<()>;

    /// Set every pixel from `leds` in order, then render.
    fn apply(&mut self, leds: &[Color]) -> Result<()> {
        for (position, color) in leds.iter().enumerate() {
            self.set(position, color);
        }
        self.render()
    }

    /// Brightness in percent. Emulators report 0.
    fn brightness(&self) -> u8;

    /// Emulators ignore this.
    fn set_brightness(&mut self, brightness: u8);

    /// Release the backend. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Row-major buffer of packed `0x00RRGGBB` pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    geometry: Geometry,
    leds: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            leds: vec![0; geometry.pixel_count()],
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn set(&mut self, position: usize, packed: u32) {
        self.leds[position] = packed;
    }

    pub fn at(&self, position: usize) -> u32 {
        self.leds[position]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.leds
    }

    pub fn clear(&mut self) {
        self.leds.fill(0);
    }
}
