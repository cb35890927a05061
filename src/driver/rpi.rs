//! [`Driver`] over the `rpi-led-matrix` binding.
//!
//! Brightness is applied in software with [`Color::apply_brightness`] while
//! the frame is copied onto the canvas; the panel itself always runs at 100%.

use super::Driver;
use crate::color::Color;
use crate::error::{Error, Result};
use crate::options::{DriverOptions, DriverRuntimeOptions};
use rpi_led_matrix::{LedCanvas, LedColor, LedMatrix, LedMatrixOptions, LedRuntimeOptions};
use std::ffi::c_int;

pub struct RpiDriver {
    matrix: LedMatrix,
    /// Always `Some` between calls; taken while the swap is in flight.
    canvas: Option<LedCanvas>,
    brightness: u8,
}

/// Convert our Color to the binding's LedColor at the boundary.
impl From<Color> for LedColor {
    fn from(c: Color) -> Self {
        LedColor {
            red: c.r,
            green: c.g,
            blue: c.b,
        }
    }
}

fn unsigned(value: c_int) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Map the translated record onto the binding's option builder. The binding
/// copies each string into its own storage, which lives as long as the
/// `LedMatrix`.
fn matrix_options(options: &DriverOptions) -> Result<LedMatrixOptions> {
    let mut led_options = LedMatrixOptions::new();
    led_options.set_hardware_mapping(&options.hardware_mapping.to_string_lossy());
    led_options.set_rows(unsigned(options.rows));
    led_options.set_cols(unsigned(options.cols));
    led_options.set_chain_length(unsigned(options.chain_length));
    led_options.set_parallel(unsigned(options.parallel));
    led_options.set_panel_type(&options.panel_type.to_string_lossy());
    led_options.set_multiplexing(unsigned(options.multiplexing));
    led_options.set_row_addr_type(unsigned(options.row_address_type));
    led_options.set_pixel_mapper_config(&options.pixel_mapper_config.to_string_lossy());
    led_options
        .set_pwm_bits(u8::try_from(options.pwm_bits).unwrap_or(11))
        .map_err(|e| Error::Allocation(e.to_string()))?;
    led_options
        .set_brightness(100)
        .map_err(|e| Error::Allocation(e.to_string()))?;
    led_options.set_refresh_rate(options.show_refresh_rate() == 1);
    led_options.set_limit_refresh(unsigned(options.limit_refresh_rate_hz));
    led_options.set_scan_mode(unsigned(options.scan_mode));
    led_options.set_pwm_lsb_nanoseconds(unsigned(options.pwm_lsb_nanoseconds));
    led_options.set_pwm_dither_bits(unsigned(options.pwm_dither_bits));
    led_options.set_hardware_pulsing(options.disable_hardware_pulsing() == 0);
    led_options.set_inverse_colors(options.inverse_colors() == 1);
    led_options.set_led_rgb_sequence(&options.led_rgb_sequence.to_string_lossy());
    Ok(led_options)
}

impl Driver for RpiDriver {
    fn open(options: &DriverOptions, runtime: &DriverRuntimeOptions) -> Result<Self> {
        let led_options = matrix_options(options)?;

        let mut rt_options = LedRuntimeOptions::new();
        rt_options.set_gpio_slowdown(unsigned(runtime.gpio_slowdown));

        let matrix = LedMatrix::new(Some(led_options), Some(rt_options))
            .map_err(|e| Error::Allocation(e.to_string()))?;
        let canvas = matrix.offscreen_canvas();

        Ok(Self {
            matrix,
            canvas: Some(canvas),
            brightness: u8::try_from(options.brightness).unwrap_or(100).min(100),
        })
    }

    fn canvas_size(&self) -> (usize, usize) {
        let (w, h) = self.canvas.as_ref().map_or((0, 0), LedCanvas::canvas_size);
        (w.max(0) as usize, h.max(0) as usize)
    }

    fn swap(&mut self, width: usize, height: usize, pixels: &[u32]) {
        let Some(mut canvas) = self.canvas.take() else {
            return;
        };

        for x in 0..width {
            for y in 0..height {
                let c = Color::from_packed(pixels[x + y * width]).apply_brightness(self.brightness);
                canvas.set(x as i32, y as i32, &c.into());
            }
        }

        self.canvas = Some(self.matrix.swap(canvas));
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness.min(100);
    }
}
