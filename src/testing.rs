//! Driver doubles standing in for the native layer in unit tests.

use crate::driver::Driver;
use crate::error::Result;
use crate::geometry::U_MAPPER;
use crate::options::{DriverOptions, DriverRuntimeOptions};
use std::cell::Cell;

/// Records every frame it is asked to swap.
pub struct FakeDriver {
    pub options: DriverOptions,
    pub runtime: DriverRuntimeOptions,
    pub frames: Vec<Vec<u32>>,
    brightness: u8,
    size: (usize, usize),
}

impl Driver for FakeDriver {
    fn open(options: &DriverOptions, runtime: &DriverRuntimeOptions) -> Result<Self> {
        let mut width = (options.cols * options.chain_length) as usize;
        let mut height = (options.rows * options.parallel) as usize;
        if options.pixel_mapper_config.to_string_lossy().contains(U_MAPPER) {
            width /= 2;
            height *= 2;
        }

        Ok(Self {
            options: options.clone(),
            runtime: *runtime,
            frames: Vec::new(),
            brightness: options.brightness as u8,
            size: (width, height),
        })
    }

    fn canvas_size(&self) -> (usize, usize) {
        self.size
    }

    fn swap(&mut self, width: usize, height: usize, pixels: &[u32]) {
        assert_eq!(pixels.len(), width * height);
        self.frames.push(pixels.to_vec());
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }
}

/// Aborts during construction, like a native library rejecting a topology.
pub struct PanickingDriver;

impl Driver for PanickingDriver {
    fn open(_options: &DriverOptions, _runtime: &DriverRuntimeOptions) -> Result<Self> {
        panic!("invalid topology");
    }

    fn canvas_size(&self) -> (usize, usize) {
        (0, 0)
    }

    fn swap(&mut self, _width: usize, _height: usize, _pixels: &[u32]) {}

    fn brightness(&self) -> u8 {
        0
    }

    fn set_brightness(&mut self, _brightness: u8) {}
}

thread_local! {
    /// Number of times [`CountingDriver::open`] ran on this test's thread.
    pub static COUNTING_DRIVER_OPENS: Cell<usize> = const { Cell::new(0) };
}

/// Counts how often construction reaches the native layer.
pub struct CountingDriver(FakeDriver);

impl Driver for CountingDriver {
    fn open(options: &DriverOptions, runtime: &DriverRuntimeOptions) -> Result<Self> {
        COUNTING_DRIVER_OPENS.with(|opens| opens.set(opens.get() + 1));
        FakeDriver::open(options, runtime).map(CountingDriver)
    }

    fn canvas_size(&self) -> (usize, usize) {
        self.0.canvas_size()
    }

    fn swap(&mut self, width: usize, height: usize, pixels: &[u32]) {
        self.0.swap(width, height, pixels);
    }

    fn brightness(&self) -> u8 {
        self.0.brightness()
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.0.set_brightness(brightness);
    }
}
