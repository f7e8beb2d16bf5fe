//! Colors, hex parsing and gradient math.
//!
//! Two representations live here:
//! - [`Color`] is the 8-bit triple that arrives on the wire as `RRGGBB`.
//! - [`Rgb`] is the normalized form (each channel in `0.0..=1.0`) that the
//!   PWM outputs consume and that gradients are computed in.

use std::fmt;

/// Number of samples between two gradient stops.
pub const GRADIENT_STEPS: usize = 100;

// ── Color ──────────────────────────────────────────────────────────

/// A fully specified 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
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

    /// Parse exactly six hex digits (case-insensitive, no `#`).
    pub fn from_hex(hex: &str) -> Result<Self, ColorFormatError> {
        if hex.len() != 6 {
            return Err(ColorFormatError::InvalidLength(hex.len()));
        }
        // from_str_radix tolerates a leading '+', so check the digits ourselves
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorFormatError::InvalidHexChar(hex.to_string()));
        }

        let component = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| ColorFormatError::InvalidHexChar(hex.to_string()))
        };

        Ok(Self {
            r: component(0..2)?,
            g: component(2..4)?,
            b: component(4..6)?,
        })
    }

    /// Uppercase `RRGGBB`, the inverse of [`Color::from_hex`].
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Scale each channel to a duty-cycle fraction.
    pub fn to_rgb(self) -> Rgb {
        Rgb {
            r: f64::from(self.r) / 255.0,
            g: f64::from(self.g) / 255.0,
            b: f64::from(self.b) / 255.0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Free-function form of [`Color::from_hex`].
pub fn parse_hex(hex: &str) -> Result<Color, ColorFormatError> {
    Color::from_hex(hex)
}

/// Why a color token failed to parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorFormatError {
    /// Not exactly six characters long.
    InvalidLength(usize),
    /// Six characters, but not all hex digits.
    InvalidHexChar(String),
}

impl fmt::Display for ColorFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength(len) => {
                write!(f, "expected 6 hex digits, got {len} characters")
            }
            Self::InvalidHexChar(token) => write!(f, "invalid hex digit in {token:?}"),
        }
    }
}

impl std::error::Error for ColorFormatError {}

// ── Normalized RGB ─────────────────────────────────────────────────

/// Per-channel intensities in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation, channel by channel: `self + (to - self) * t`.
    pub fn lerp(self, to: Rgb, t: f64) -> Rgb {
        Rgb {
            r: self.r + (to.r - self.r) * t,
            g: self.g + (to.g - self.g) * t,
            b: self.b + (to.b - self.b) * t,
        }
    }
}

impl From<Color> for Rgb {
    fn from(c: Color) -> Self {
        c.to_rgb()
    }
}

/// Interpolate between two stops; `t = 0` is `from`, `t = 1` is `to`.
pub fn lerp(from: Rgb, to: Rgb, t: f64) -> Rgb {
    from.lerp(to, t)
}

// ── Gradients ──────────────────────────────────────────────────────

/// `steps` samples from `from` towards `to`, at `t = i / steps`.
///
/// The end stop itself is never emitted: the last sample is one step short
/// of `to`. Fades pick `to` up as the first sample of the next segment.
pub fn build_gradient(from: Rgb, to: Rgb, steps: usize) -> Vec<Rgb> {
    (0..steps)
        .map(|i| from.lerp(to, i as f64 / steps as f64))
        .collect()
}
