//! In-process raster emulator.
//!
//! Pixels are written to a back raster; `render` publishes it as the visible
//! surface and starts a new black raster. When a snapshot path is set, each
//! published surface is also written as a PNG scaled up by the pixel pitch,
//! which is the closest thing to a window this crate draws.

use crate::color::{Color, ColorModel, pack};
use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::matrix::Matrix;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Screen pixels per LED in snapshots.
pub const DEFAULT_PIXEL_PITCH: u32 = 12;

/// Environment variable naming a PNG file to rewrite on every render.
pub const SNAPSHOT_ENV: &str = "MATRIX_EMULATOR_SNAPSHOT";

pub struct ImageEmulator {
    geometry: Geometry,
    pixel_pitch: u32,
    raster: RgbImage,
    surface: RgbImage,
    snapshot: Option<PathBuf>,
    closed: bool,
}

fn blank(geometry: Geometry) -> RgbImage {
    RgbImage::new(geometry.width as u32, geometry.height as u32)
}

impl ImageEmulator {
    pub fn new(geometry: Geometry, pixel_pitch: u32) -> Self {
        tracing::info!(
            "Image emulator ready: {}x{} (pitch {})",
            geometry.width,
            geometry.height,
            pixel_pitch
        );
        Self {
            geometry,
            pixel_pitch: pixel_pitch.max(1),
            raster: blank(geometry),
            surface: blank(geometry),
            snapshot: None,
            closed: false,
        }
    }

    /// Write every rendered surface to `path` as PNG.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    /// Pick up the snapshot path from [`SNAPSHOT_ENV`] if set.
    pub fn with_snapshot_from_env(self) -> Self {
        match std::env::var_os(SNAPSHOT_ENV) {
            Some(path) if !path.is_empty() => self.with_snapshot(path),
            _ => self,
        }
    }

    /// The last rendered frame, one image pixel per LED.
    pub fn surface(&self) -> &RgbImage {
        &self.surface
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    fn write_snapshot(&self, path: &Path) -> Result<()> {
        let scaled = imageops::resize(
            &self.surface,
            self.surface.width() * self.pixel_pitch,
            self.surface.height() * self.pixel_pitch,
            FilterType::Nearest,
        );
        scaled.save(path)?;
        Ok(())
    }
}

impl Matrix for ImageEmulator {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn set(&mut self, position: usize, color: &dyn ColorModel) {
        assert!(
            position < self.geometry.pixel_count(),
            "position {position} out of range for {}x{} matrix",
            self.geometry.width,
            self.geometry.height
        );
        let (x, y) = self.geometry.coordinates(position);
        self.raster.put_pixel(x as u32, y as u32, Color::from_packed(pack(color)).into());
    }

    fn at(&self, position: usize) -> Color {
        assert!(
            position < self.geometry.pixel_count(),
            "position {position} out of range for {}x{} matrix",
            self.geometry.width,
            self.geometry.height
        );
        let (x, y) = self.geometry.coordinates(position);
        Color::from(*self.raster.get_pixel(x as u32, y as u32))
    }

    fn render(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        self.surface = std::mem::replace(&mut self.raster, blank(self.geometry));
        if let Some(path) = &self.snapshot {
            self.write_snapshot(path)?;
        }
        Ok(())
    }

    fn brightness(&self) -> u8 {
        0
    }

    fn set_brightness(&mut self, _brightness: u8) {}

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            tracing::debug!("Image emulator closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for ImageEmulator {
    fn default() -> Self {
        Self::new(Geometry::new(32, 32), DEFAULT_PIXEL_PITCH)
    }
}
