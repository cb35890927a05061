//! Color model and the 32-bit packed pixel codec.
//!
//! Backends store pixels either as packed `u32` values (`0x00RRGGBB`) or as
//! 8-bit rasters. Anything implementing [`ColorModel`] can be packed; the
//! channels are reported in a 16-bit range and shifted down to 8 bits, so an
//! `Rgb<u16>` and the equivalent `Rgb<u8>` pack to the same value.

use image::{Rgb, Rgba};

/// 8-bit RGB color used throughout the matrix API.
///
/// Decoupled from the hardware crate so color logic is testable without
/// `rpi-led-matrix`. Converted to `LedColor` only inside the native driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a hue value (0-360), with full saturation and brightness.
    pub fn from_hue(hue: u16) -> Self {
        let hue = hue % 360;
        let sector = hue / 60;
        let fraction = ((hue % 60) as f32) / 60.0;
        let rising = (fraction * 255.0) as u8;
        let falling = ((1.0 - fraction) * 255.0) as u8;

        match sector {
            0 => Self::new(255, rising, 0),  // Red → Yellow
            1 => Self::new(falling, 255, 0), // Yellow → Green
            2 => Self::new(0, 255, rising),  // Green → Cyan
            3 => Self::new(0, falling, 255), // Cyan → Blue
            4 => Self::new(rising, 0, 255),  // Blue → Magenta
            _ => Self::new(255, 0, falling), // Magenta → Red
        }
    }

    /// Apply brightness scaling (0-100) to this color.
    pub fn apply_brightness(self, brightness: u8) -> Self {
        if brightness >= 100 {
            return self;
        }
        Self {
            r: ((self.r as u16 * brightness as u16) / 100) as u8,
            g: ((self.g as u16 * brightness as u16) / 100) as u8,
            b: ((self.b as u16 * brightness as u16) / 100) as u8,
        }
    }

    pub fn packed(self) -> u32 {
        pack(&self)
    }

    pub fn from_packed(packed: u32) -> Self {
        let Rgba([r, g, b, _]) = unpack(packed);
        Self { r, g, b }
    }
}

impl From<Rgb<u8>> for Color {
    fn from(Rgb([r, g, b]): Rgb<u8>) -> Self {
        Self { r, g, b }
    }
}

impl From<Color> for Rgb<u8> {
    fn from(c: Color) -> Self {
        Rgb([c.r, c.g, c.b])
    }
}

/// A color that can report its channels in the 16-bit (0-65535) range.
///
/// Alpha is not part of the model: the panel and the terminal have no
/// notion of transparency.
pub trait ColorModel {
    fn rgb16(&self) -> [u32; 3];
}

/// Widen an 8-bit channel so that `c >> 8` recovers it exactly.
fn widen(c: u8) -> u32 {
    c as u32 * 0x101
}

impl ColorModel for Color {
    fn rgb16(&self) -> [u32; 3] {
        [widen(self.r), widen(self.g), widen(self.b)]
    }
}

impl ColorModel for Rgb<u8> {
    fn rgb16(&self) -> [u32; 3] {
        let Rgb([r, g, b]) = *self;
        [widen(r), widen(g), widen(b)]
    }
}

impl ColorModel for Rgba<u8> {
    fn rgb16(&self) -> [u32; 3] {
        let Rgba([r, g, b, _]) = *self;
        [widen(r), widen(g), widen(b)]
    }
}

impl ColorModel for Rgb<u16> {
    fn rgb16(&self) -> [u32; 3] {
        let Rgb([r, g, b]) = *self;
        [r as u32, g as u32, b as u32]
    }
}

impl ColorModel for Rgba<u16> {
    fn rgb16(&self) -> [u32; 3] {
        let Rgba([r, g, b, _]) = *self;
        [r as u32, g as u32, b as u32]
    }
}

/// An absent color packs to black.
impl<C: ColorModel> ColorModel for Option<C> {
    fn rgb16(&self) -> [u32; 3] {
        self.as_ref().map_or([0; 3], ColorModel::rgb16)
    }
}

impl<C: ColorModel + ?Sized> ColorModel for &C {
    fn rgb16(&self) -> [u32; 3] {
        (**self).rgb16()
    }
}

/// Pack a color into `0x00RRGGBB`. Each channel is truncated, not rounded.
pub fn pack<C: ColorModel + ?Sized>(color: &C) -> u32 {
    let [r, g, b] = color.rgb16();
    (((r >> 8) & 0xff) << 16) | (((g >> 8) & 0xff) << 8) | ((b >> 8) & 0xff)
}

/// Unpack `0x00RRGGBB`. Alpha is always 0.
pub fn unpack(packed: u32) -> Rgba<u8> {
    Rgba([
        (packed >> 16) as u8,
        (packed >> 8) as u8,
        packed as u8,
        0,
    ])
}
