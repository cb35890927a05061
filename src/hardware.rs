//! [`Matrix`] backed by the native panel driver.
//!
//! Pixels are kept as packed `u32`s in a [`FrameBuffer`] sized to the
//! driver-reported canvas. `render` hands the whole buffer to the driver,
//! which blocks until vsync.

use crate::color::{Color, ColorModel, pack};
use crate::config::{HardwareConfig, RuntimeConfig};
use crate::driver::{Driver, NativeDriver};
use crate::error::{Error, Result};
use crate::geometry::{self, Geometry};
use crate::matrix::{FrameBuffer, Matrix};
use crate::options::{translate, translate_runtime};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

pub struct HardwareMatrix<D: Driver = NativeDriver> {
    /// `None` once closed.
    driver: Option<D>,
    leds: FrameBuffer,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "native driver panicked".to_string()
    }
}

impl<D: Driver> HardwareMatrix<D> {
    /// Open the driver and size the frame buffer to its canvas.
    ///
    /// A panic inside the driver during this call is caught and reported as
    /// [`Error::Construction`]. Calls made after construction are not
    /// guarded.
    pub fn new(config: &HardwareConfig, runtime: &RuntimeConfig) -> Result<Self> {
        let options = translate(config)?;
        let rt_options = translate_runtime(runtime);

        let driver = catch_unwind(AssertUnwindSafe(|| D::open(&options, &rt_options)))
            .map_err(|payload| Error::Construction(panic_message(payload)))??;
        drop(options);

        let (width, height) = driver.canvas_size();
        let geometry = Geometry::new(width, height);
        if geometry.pixel_count() == 0 {
            return Err(Error::Allocation(format!(
                "driver reported an empty {width}x{height} canvas"
            )));
        }

        let configured = geometry::resolve(config);
        if configured != geometry {
            tracing::debug!(
                "Driver canvas is {}x{}, topology gives {}x{}",
                geometry.width,
                geometry.height,
                configured.width,
                configured.height
            );
        }
        tracing::info!("Hardware matrix ready: {}x{}", geometry.width, geometry.height);

        Ok(Self {
            driver: Some(driver),
            leds: FrameBuffer::new(geometry),
        })
    }

    pub fn driver(&self) -> Option<&D> {
        self.driver.as_ref()
    }
}

impl<D: Driver> Matrix for HardwareMatrix<D> {
    fn geometry(&self) -> Geometry {
        self.leds.geometry()
    }

    fn set(&mut self, position: usize, color: &dyn ColorModel) {
        self.leds.set(position, pack(color));
    }

    fn at(&self, position: usize) -> Color {
        Color::from_packed(self.leds.at(position))
    }

    fn render(&mut self) -> Result<()> {
        let driver = self.driver.as_mut().ok_or(Error::Closed)?;
        let Geometry { width, height } = self.leds.geometry();
        driver.swap(width, height, self.leds.as_slice());
        self.leds.clear();
        Ok(())
    }

    fn brightness(&self) -> u8 {
        self.driver.as_ref().map_or(0, Driver::brightness)
    }

    fn set_brightness(&mut self, brightness: u8) {
        if let Some(driver) = self.driver.as_mut() {
            driver.set_brightness(brightness);
        }
    }

    fn close(&mut self) -> Result<()> {
        match self.driver.take() {
            Some(driver) => {
                drop(driver);
                tracing::info!("Hardware matrix closed");
            }
            None => tracing::debug!("Hardware matrix already closed"),
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.driver.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDriver, PanickingDriver};
    use pretty_assertions::assert_eq;

    fn open(config: &HardwareConfig) -> HardwareMatrix<FakeDriver> {
        HardwareMatrix::new(config, &RuntimeConfig::default()).unwrap()
    }

    fn small() -> HardwareConfig {
        HardwareConfig {
            rows: 2,
            cols: 3,
            ..HardwareConfig::default()
        }
    }

    #[test]
    fn geometry_comes_from_driver_canvas() {
        let config = HardwareConfig {
            rows: 16,
            cols: 32,
            chain_length: 2,
            ..HardwareConfig::default()
        };
        assert_eq!(open(&config).geometry(), Geometry::new(64, 16));

        let config = HardwareConfig {
            pixel_mapper_config: "U-mapper".to_string(),
            ..config
        };
        assert_eq!(open(&config).geometry(), Geometry::new(32, 32));
    }

    #[test]
    fn driver_receives_translated_options() {
        let config = HardwareConfig {
            gpio_mapping: "adafruit-hat".to_string(),
            inverse_colors: true,
            ..small()
        };
        let matrix = HardwareMatrix::<FakeDriver>::new(&config, &RuntimeConfig { gpio_slowdown: 2 })
            .unwrap();
        let driver = matrix.driver().unwrap();
        assert_eq!(driver.options.hardware_mapping.as_bytes(), b"adafruit-hat");
        assert_eq!(driver.options.inverse_colors(), 1);
        assert_eq!(driver.runtime.gpio_slowdown, 2);
    }

    #[test]
    fn render_pushes_packed_frame_and_clears() {
        let mut matrix = open(&small());
        matrix.set(0, &Color::new(255, 0, 0));
        matrix.set(5, &Color::new(0, 0, 255));
        assert_eq!(matrix.at(5), Color::new(0, 0, 255));

        matrix.render().unwrap();

        let frames = &matrix.driver().unwrap().frames;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], vec![0xff0000, 0, 0, 0, 0, 0x0000ff]);
        assert_eq!(matrix.at(0), Color::BLACK);
        assert_eq!(matrix.at(5), Color::BLACK);
    }

    #[test]
    fn render_without_set_pushes_black() {
        let mut matrix = open(&small());
        matrix.render().unwrap();
        assert_eq!(matrix.driver().unwrap().frames[0], vec![0; 6]);
        for position in 0..6 {
            assert_eq!(matrix.at(position), Color::BLACK);
        }
    }

    #[test]
    fn apply_matches_set_then_render() {
        let leds: Vec<Color> = (0..6).map(|i| Color::new(i * 40, 255 - i, i)).collect();

        let mut applied = open(&small());
        applied.apply(&leds).unwrap();

        let mut manual = open(&small());
        for (position, color) in leds.iter().enumerate() {
            manual.set(position, color);
        }
        manual.render().unwrap();

        assert_eq!(
            applied.driver().unwrap().frames,
            manual.driver().unwrap().frames
        );
    }

    #[test]
    fn brightness_passes_through() {
        let config = HardwareConfig {
            brightness: 60,
            ..small()
        };
        let mut matrix = open(&config);
        assert_eq!(matrix.brightness(), 60);
        matrix.set_brightness(25);
        assert_eq!(matrix.brightness(), 25);
    }

    #[test]
    fn close_twice_is_harmless() {
        let mut matrix = open(&small());
        matrix.close().unwrap();
        matrix.close().unwrap();
        assert!(matrix.is_closed());
        assert_eq!(matrix.brightness(), 0);
    }

    #[test]
    fn render_after_close_is_an_error() {
        let mut matrix = open(&small());
        matrix.close().unwrap();
        assert!(matches!(matrix.render(), Err(Error::Closed)));
    }

    #[test]
    #[should_panic]
    fn set_out_of_range_panics() {
        let mut matrix = open(&small());
        matrix.set(6, &Color::BLACK);
    }

    #[test]
    fn driver_panic_becomes_construction_error() {
        let result = HardwareMatrix::<PanickingDriver>::new(&small(), &RuntimeConfig::default());
        match result {
            Err(Error::Construction(message)) => assert!(message.contains("invalid topology")),
            Err(other) => panic!("expected Construction error, got {other}"),
            Ok(_) => panic!("expected Construction error"),
        }
    }

    #[test]
    fn empty_canvas_is_an_allocation_error() {
        let config = HardwareConfig {
            rows: 0,
            ..small()
        };
        let result = HardwareMatrix::<FakeDriver>::new(&config, &RuntimeConfig::default());
        assert!(matches!(result, Err(Error::Allocation(_))));
    }
}
