//! Backend selection.
//!
//! Two environment toggles are read once, when a matrix is created:
//!
//! | Variable | Backend |
//! |---|---|
//! | `MATRIX_EMULATOR=1` | [`ImageEmulator`] |
//! | `MATRIX_TERMINAL_EMULATOR=1` | [`TerminalEmulator`] |
//! | neither | [`HardwareMatrix`] |
//!
//! The image emulator wins if both are set. A hardware matrix that fails to
//! open is returned as an error; there is no implicit fallback to an emulator.

use crate::color::{Color, ColorModel};
use crate::config::{HardwareConfig, RuntimeConfig};
use crate::driver::{Driver, NativeDriver};
use crate::emulator::{DEFAULT_PIXEL_PITCH, ImageEmulator};
use crate::error::Result;
use crate::geometry::{self, Geometry};
use crate::hardware::HardwareMatrix;
use crate::matrix::Matrix;
use crate::terminal::TerminalEmulator;
use std::fmt;

pub const MATRIX_EMULATOR_ENV: &str = "MATRIX_EMULATOR";
pub const TERMINAL_MATRIX_EMULATOR_ENV: &str = "MATRIX_TERMINAL_EMULATOR";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Hardware,
    ImageEmulator,
    TerminalEmulator,
}

impl BackendKind {
    /// Read the toggles from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Select a backend from an arbitrary variable lookup. A toggle is on
    /// only when its value is exactly `1`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = |key: &str| lookup(key).is_some_and(|value| value == "1");
        if enabled(MATRIX_EMULATOR_ENV) {
            Self::ImageEmulator
        } else if enabled(TERMINAL_MATRIX_EMULATOR_ENV) {
            Self::TerminalEmulator
        } else {
            Self::Hardware
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Hardware => "hardware",
            Self::ImageEmulator => "image-emulator",
            Self::TerminalEmulator => "terminal-emulator",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whichever backend was selected, behind one [`Matrix`] implementation.
pub enum AnyMatrix<D: Driver = NativeDriver> {
    Hardware(HardwareMatrix<D>),
    ImageEmulator(ImageEmulator),
    TerminalEmulator(TerminalEmulator),
}

impl<D: Driver> AnyMatrix<D> {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Hardware(_) => BackendKind::Hardware,
            Self::ImageEmulator(_) => BackendKind::ImageEmulator,
            Self::TerminalEmulator(_) => BackendKind::TerminalEmulator,
        }
    }

    fn inner(&self) -> &dyn Matrix {
        match self {
            Self::Hardware(m) => m,
            Self::ImageEmulator(m) => m,
            Self::TerminalEmulator(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Matrix {
        match self {
            Self::Hardware(m) => m,
            Self::ImageEmulator(m) => m,
            Self::TerminalEmulator(m) => m,
        }
    }
}

impl<D: Driver> Matrix for AnyMatrix<D> {
    fn geometry(&self) -> Geometry {
        self.inner().geometry()
    }

    fn set(&mut self, position: usize, color: &dyn ColorModel) {
        self.inner_mut().set(position, color);
    }

    fn at(&self, position: usize) -> Color {
        self.inner().at(position)
    }

    fn render(&mut self) -> Result<()> {
        self.inner_mut().render()
    }

    fn apply(&mut self, leds: &[Color]) -> Result<()> {
        self.inner_mut().apply(leds)
    }

    fn brightness(&self) -> u8 {
        self.inner().brightness()
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.inner_mut().set_brightness(brightness);
    }

    fn close(&mut self) -> Result<()> {
        self.inner_mut().close()
    }

    fn is_closed(&self) -> bool {
        self.inner().is_closed()
    }
}

/// Create a matrix for the backend selected by the environment.
pub fn new_matrix(config: &HardwareConfig, runtime: &RuntimeConfig) -> Result<AnyMatrix> {
    new_matrix_for(BackendKind::from_env(), config, runtime)
}

/// Create a matrix for an explicit backend, with `D` as the native driver.
pub fn new_matrix_for<D: Driver>(
    kind: BackendKind,
    config: &HardwareConfig,
    runtime: &RuntimeConfig,
) -> Result<AnyMatrix<D>> {
    tracing::info!("Selected {} backend", kind);
    let matrix = match kind {
        BackendKind::ImageEmulator => {
            let emulator = ImageEmulator::new(geometry::resolve(config), DEFAULT_PIXEL_PITCH)
                .with_snapshot_from_env();
            if let Some(path) = emulator.snapshot_path() {
                tracing::info!("Writing emulator snapshots to {}", path.display());
            }
            AnyMatrix::ImageEmulator(emulator)
        }
        BackendKind::TerminalEmulator => AnyMatrix::TerminalEmulator(TerminalEmulator::new(
            geometry::resolve_for_terminal(config),
        )?),
        BackendKind::Hardware => AnyMatrix::Hardware(HardwareMatrix::new(config, runtime)?),
    };
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{COUNTING_DRIVER_OPENS, CountingDriver, FakeDriver, PanickingDriver};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[rstest]
    #[case(&[], BackendKind::Hardware)]
    #[case(&[("MATRIX_EMULATOR", "1")], BackendKind::ImageEmulator)]
    #[case(&[("MATRIX_TERMINAL_EMULATOR", "1")], BackendKind::TerminalEmulator)]
    #[case(&[("MATRIX_EMULATOR", "1"), ("MATRIX_TERMINAL_EMULATOR", "1")], BackendKind::ImageEmulator)]
    #[case(&[("MATRIX_EMULATOR", "0")], BackendKind::Hardware)]
    #[case(&[("MATRIX_EMULATOR", "yes"), ("MATRIX_TERMINAL_EMULATOR", "1")], BackendKind::TerminalEmulator)]
    fn toggles_select_backend(#[case] vars: &[(&str, &str)], #[case] expected: BackendKind) {
        assert_eq!(BackendKind::from_lookup(lookup(vars)), expected);
    }

    #[test]
    fn image_emulator_never_opens_driver() {
        let config = HardwareConfig::default();
        let matrix =
            new_matrix_for::<CountingDriver>(BackendKind::ImageEmulator, &config, &RuntimeConfig::default())
                .unwrap();

        assert_eq!(matrix.kind(), BackendKind::ImageEmulator);
        assert_eq!(COUNTING_DRIVER_OPENS.with(|opens| opens.get()), 0);
    }

    #[test]
    fn hardware_opens_driver_once() {
        let config = HardwareConfig::default();
        let matrix =
            new_matrix_for::<CountingDriver>(BackendKind::Hardware, &config, &RuntimeConfig::default())
                .unwrap();

        assert_eq!(matrix.kind(), BackendKind::Hardware);
        assert_eq!(COUNTING_DRIVER_OPENS.with(|opens| opens.get()), 1);
    }

    #[test]
    fn image_emulator_uses_topology_geometry() {
        let config = HardwareConfig {
            rows: 16,
            cols: 32,
            chain_length: 2,
            pixel_mapper_config: "U-mapper".to_string(),
            ..HardwareConfig::default()
        };
        let matrix =
            new_matrix_for::<FakeDriver>(BackendKind::ImageEmulator, &config, &RuntimeConfig::default())
                .unwrap();
        assert_eq!(matrix.geometry(), Geometry::new(64, 16));
    }

    #[test]
    fn hardware_failure_is_not_masked() {
        let result = new_matrix_for::<PanickingDriver>(
            BackendKind::Hardware,
            &HardwareConfig::default(),
            &RuntimeConfig::default(),
        );
        assert!(matches!(result, Err(Error::Construction(_))));
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn native_driver_is_unavailable_without_feature() {
        let result = new_matrix_for::<NativeDriver>(
            BackendKind::Hardware,
            &HardwareConfig::default(),
            &RuntimeConfig::default(),
        );
        assert!(matches!(result, Err(Error::DriverUnavailable)));
    }

    #[test]
    fn every_backend_accepts_any_color_model() {
        let config = HardwareConfig {
            rows: 1,
            cols: 2,
            ..HardwareConfig::default()
        };
        let geometry = Geometry::new(2, 1);
        let mut backends: Vec<Box<dyn Matrix>> = vec![
            Box::new(HardwareMatrix::<FakeDriver>::new(&config, &RuntimeConfig::default()).unwrap()),
            Box::new(ImageEmulator::new(geometry, 1)),
            Box::new(TerminalEmulator::headless(geometry, Vec::new())),
        ];

        for matrix in &mut backends {
            matrix.set(0, &image::Rgb([0xffff_u16, 0x8000, 0x00ff]));
            matrix.set(1, &Some(Color::new(1, 2, 3)));
            assert_eq!(matrix.at(0), Color::new(0xff, 0x80, 0x00));
            assert_eq!(matrix.at(1), Color::new(1, 2, 3));

            matrix.set(1, &None::<Color>);
            assert_eq!(matrix.at(1), Color::BLACK);
        }
    }

    #[test]
    fn any_matrix_delegates_frame_cycle() {
        let config = HardwareConfig {
            rows: 2,
            cols: 2,
            ..HardwareConfig::default()
        };
        let mut matrix =
            new_matrix_for::<FakeDriver>(BackendKind::Hardware, &config, &RuntimeConfig::default())
                .unwrap();

        matrix.set(0, &Color::new(1, 2, 3));
        assert_eq!(matrix.at(0), Color::new(1, 2, 3));
        matrix.render().unwrap();
        assert_eq!(matrix.at(0), Color::BLACK);

        let AnyMatrix::Hardware(hardware) = &matrix else {
            panic!("expected hardware backend");
        };
        assert_eq!(hardware.driver().unwrap().frames, vec![vec![0x010203, 0, 0, 0]]);

        matrix.close().unwrap();
        matrix.close().unwrap();
        assert!(matrix.is_closed());
    }
}
