//! Translation of [`HardwareConfig`] / [`RuntimeConfig`] into the flat
//! option records the native driver consumes.
//!
//! The records mirror the C option structs: integers as `c_int`, strings as
//! NUL-terminated `CString`s, and flags as `c_int` that are always exactly 0
//! or 1.
//!
//! ## String ownership
//! [`DriverOptions`] owns every string. It is borrowed by
//! [`Driver::open`](crate::driver::Driver::open) for the duration of that call
//! and dropped by the caller afterwards; a driver that needs the strings
//! later must copy them during `open`.

use crate::config::{HardwareConfig, RuntimeConfig};
use crate::error::{Error, Result};
use std::ffi::{CString, c_int};

/// Native matrix options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverOptions {
    pub hardware_mapping: CString,
    pub rows: c_int,
    pub cols: c_int,
    pub chain_length: c_int,
    pub parallel: c_int,
    pub panel_type: CString,
    pub multiplexing: c_int,
    pub row_address_type: c_int,
    pub pixel_mapper_config: CString,
    pub brightness: c_int,
    pub pwm_bits: c_int,
    pub limit_refresh_rate_hz: c_int,
    pub scan_mode: c_int,
    pub pwm_lsb_nanoseconds: c_int,
    pub pwm_dither_bits: c_int,
    pub led_rgb_sequence: CString,
    show_refresh_rate: c_int,
    disable_hardware_pulsing: c_int,
    inverse_colors: c_int,
}

/// Native runtime options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverRuntimeOptions {
    pub gpio_slowdown: c_int,
}

/// Collapse any non-zero value to 1.
fn normalize_flag(value: c_int) -> c_int {
    if value != 0 { 1 } else { 0 }
}

impl DriverOptions {
    pub fn set_show_refresh_rate(&mut self, value: c_int) {
        self.show_refresh_rate = normalize_flag(value);
    }

    pub fn set_disable_hardware_pulsing(&mut self, value: c_int) {
        self.disable_hardware_pulsing = normalize_flag(value);
    }

    pub fn set_inverse_colors(&mut self, value: c_int) {
        self.inverse_colors = normalize_flag(value);
    }

    pub fn show_refresh_rate(&self) -> c_int {
        self.show_refresh_rate
    }

    pub fn disable_hardware_pulsing(&self) -> c_int {
        self.disable_hardware_pulsing
    }

    pub fn inverse_colors(&self) -> c_int {
        self.inverse_colors
    }
}

fn c_string(field: &'static str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|source| Error::InvalidOption { field, source })
}

/// Values that overflow `c_int` saturate rather than wrap.
fn c_int_from<T: TryInto<c_int>>(value: T) -> c_int {
    value.try_into().unwrap_or(c_int::MAX)
}

/// Build the native option record. Fails only when a string option contains
/// an interior NUL byte.
pub fn translate(config: &HardwareConfig) -> Result<DriverOptions> {
    let mut options = DriverOptions {
        hardware_mapping: c_string("gpio_mapping", &config.gpio_mapping)?,
        rows: c_int_from(config.rows),
        cols: c_int_from(config.cols),
        chain_length: c_int_from(config.chain_length),
        parallel: c_int_from(config.parallel),
        panel_type: c_string("panel_type", &config.panel_type)?,
        multiplexing: c_int_from(config.multiplexing),
        row_address_type: c_int_from(config.row_address_type),
        pixel_mapper_config: c_string("pixel_mapper_config", &config.pixel_mapper_config)?,
        brightness: c_int::from(config.brightness),
        pwm_bits: c_int::from(config.pwm_bits),
        limit_refresh_rate_hz: c_int_from(config.limit_refresh),
        scan_mode: config.scan_mode as c_int,
        pwm_lsb_nanoseconds: c_int_from(config.pwm_lsb_nanoseconds),
        pwm_dither_bits: c_int_from(config.pwm_dither_bits),
        led_rgb_sequence: c_string("rgb_sequence", &config.rgb_sequence)?,
        show_refresh_rate: 0,
        disable_hardware_pulsing: 0,
        inverse_colors: 0,
    };

    options.set_show_refresh_rate(c_int::from(config.show_refresh_rate));
    options.set_disable_hardware_pulsing(c_int::from(config.disable_hardware_pulsing));
    options.set_inverse_colors(c_int::from(config.inverse_colors));

    Ok(options)
}

pub fn translate_runtime(config: &RuntimeConfig) -> DriverRuntimeOptions {
    DriverRuntimeOptions {
        gpio_slowdown: c_int_from(config.gpio_slowdown),
    }
}
