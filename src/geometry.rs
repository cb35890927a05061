//! Logical display size derived from panel topology.

use crate::config::HardwareConfig;
use serde::Serialize;

/// Pixel mapper token that folds a long chain into a U shape: half as wide,
/// twice as tall.
pub const U_MAPPER: &str = "U-mapper";

/// Width and height of the logical pixel grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, utoipa::ToSchema)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
}

impl Geometry {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Number of bytes in a raw RGB24 frame.
    pub fn frame_byte_count(&self) -> usize {
        self.pixel_count() * 3
    }

    /// Row-major position of `(x, y)`.
    pub fn position(&self, x: usize, y: usize) -> usize {
        x + y * self.width
    }

    /// Inverse of [`Geometry::position`].
    pub fn coordinates(&self, position: usize) -> (usize, usize) {
        (position % self.width, position / self.width)
    }
}

/// `cols * chain_length` by `rows * parallel`. Pixel mappers are left to the
/// driver.
pub fn resolve(config: &HardwareConfig) -> Geometry {
    Geometry::new(
        config.cols * config.chain_length,
        config.rows * config.parallel,
    )
}

/// Geometry as seen by the terminal emulator, which applies the U-mapper
/// itself since there is no driver to do it.
///
/// Odd widths are not rejected; they simply lose a column.
pub fn resolve_for_terminal(config: &HardwareConfig) -> Geometry {
    let mut geometry = resolve(config);
    if config.pixel_mapper_config.contains(U_MAPPER) {
        geometry.width /= 2;
        geometry.height *= 2;
    }
    geometry
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn config(rows: usize, cols: usize, chain_length: usize, parallel: usize) -> HardwareConfig {
        HardwareConfig {
            rows,
            cols,
            chain_length,
            parallel,
            ..HardwareConfig::default()
        }
    }

    #[rstest]
    #[case(16, 32, 2, 1, 64, 16)]
    #[case(32, 32, 1, 1, 32, 32)]
    #[case(32, 64, 4, 3, 256, 96)]
    fn resolve_multiplies_topology(
        #[case] rows: usize,
        #[case] cols: usize,
        #[case] chain: usize,
        #[case] parallel: usize,
        #[case] width: usize,
        #[case] height: usize,
    ) {
        assert_eq!(
            resolve(&config(rows, cols, chain, parallel)),
            Geometry::new(width, height)
        );
    }

    #[test]
    fn resolve_ignores_u_mapper() {
        let mut c = config(32, 32, 2, 1);
        c.pixel_mapper_config = "U-mapper".to_string();
        assert_eq!(resolve(&c), Geometry::new(64, 32));
    }

    #[test]
    fn terminal_applies_u_mapper() {
        let mut c = config(32, 32, 2, 1);
        c.pixel_mapper_config = "Rotate:90;U-mapper".to_string();
        assert_eq!(resolve_for_terminal(&c), Geometry::new(32, 64));
    }

    #[test]
    fn terminal_without_mapper_uses_base_formula() {
        assert_eq!(
            resolve_for_terminal(&config(32, 32, 2, 1)),
            Geometry::new(64, 32)
        );
    }

    #[test]
    fn position_and_coordinates_are_row_major() {
        let g = Geometry::new(64, 16);
        assert_eq!(g.position(3, 2), 131);
        assert_eq!(g.coordinates(131), (3, 2));
        assert_eq!(g.pixel_count(), 1024);
        assert_eq!(g.frame_byte_count(), 3072);
    }
}
