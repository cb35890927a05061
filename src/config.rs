//! Panel topology and runtime tuning configuration.
//!
//! Both records are plain data owned by the caller. A matrix reads them once
//! during construction and keeps its own copy.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Progressive or interlaced row scanning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Progressive = 0,
    Interlaced = 1,
}

/// Runtime options that tune the GPIO transport rather than the panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Newer Pis write to GPIO faster than most panels can latch. Zero means
    /// no slowdown; a Pi Zero 2 W or Pi 4 typically needs 2 or more.
    pub gpio_slowdown: u32,
}

/// Panel topology and display quality settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// GPIO wiring: `regular`, `adafruit-hat`, `adafruit-hat-pwm`, `compute-module`.
    pub gpio_mapping: String,
    /// Rows per panel (typically 16, 32 or 64).
    pub rows: usize,
    /// Columns per panel (typically 32 or 64).
    pub cols: usize,
    /// Number of daisy-chained panels.
    pub chain_length: usize,
    /// Number of parallel chains (1-3 depending on the Pi).
    pub parallel: usize,
    /// Panel chipset needing special init, e.g. `FM6126A`. Empty for none.
    pub panel_type: String,
    /// Outdoor panel multiplexing: 0 = direct, 1 = stripe, 2 = checkered, ...
    pub multiplexing: u32,
    /// 0 = default, 1 = AB-addressed 64x64, 2 = direct row select, ...
    pub row_address_type: u32,
    /// Semicolon-separated pixel mapper chain, e.g. `U-mapper;Rotate:90`.
    pub pixel_mapper_config: String,
    /// Initial brightness in percent, 1..=100.
    pub brightness: u8,
    /// PWM bits used for output (1..=11).
    pub pwm_bits: u8,
    pub show_refresh_rate: bool,
    /// Refresh rate cap in Hz, 0 for none.
    pub limit_refresh: u32,
    pub scan_mode: ScanMode,
    /// Base on-time of the least significant PWM bit, in nanoseconds.
    pub pwm_lsb_nanoseconds: u32,
    /// Number of low PWM bits that are time-dithered.
    pub pwm_dither_bits: u32,
    pub disable_hardware_pulsing: bool,
    pub inverse_colors: bool,
    /// Channel order for panels with swapped LEDs, e.g. `RBG`.
    pub rgb_sequence: String,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            gpio_mapping: "regular".to_string(),
            rows: 32,
            cols: 32,
            chain_length: 1,
            parallel: 1,
            panel_type: String::new(),
            multiplexing: 0,
            row_address_type: 0,
            pixel_mapper_config: String::new(),
            brightness: 100,
            pwm_bits: 11,
            show_refresh_rate: false,
            limit_refresh: 0,
            scan_mode: ScanMode::Progressive,
            pwm_lsb_nanoseconds: 130,
            pwm_dither_bits: 0,
            disable_hardware_pulsing: false,
            inverse_colors: false,
            rgb_sequence: "RGB".to_string(),
        }
    }
}

/// Layout of a settings file: `{"hardware": {...}, "runtime": {...}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hardware: HardwareConfig,
    pub runtime: RuntimeConfig,
}

impl Settings {
    /// Load settings from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
