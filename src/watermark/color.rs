//! Watermark text colour.
//!
//! Accepts the colour notations a host style sheet would: `#RGB`, `#RRGGBB`,
//! `#RRGGBBAA`, `rgb(r, g, b)`, `rgba(r, g, b, a)` and a few names.
//!
//! ```ignore
//! use filigrane::watermark::Rgba;
//!
//! let c = Rgba::parse("rgba(255,255,255,.5)").unwrap();
//! assert_eq!(c, Rgba::new(255, 255, 255, 128));
//! ```

use super::InvalidWatermarkConfigError;
use std::fmt;
use std::str::FromStr;

/// Straight (non-premultiplied) RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Alpha as a fraction in `[0.0, 1.0]`.
    pub fn alpha(&self) -> f32 {
        self.a as f32 / 255.0
    }

    /// Parse a colour string.
    pub fn parse(input: &str) -> Result<Self, InvalidWatermarkConfigError> {
        let s = input.trim();
        let lower = s.to_ascii_lowercase();

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| invalid(input));
        }

        if let Some(args) = lower
            .strip_prefix("rgba(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(args, true).ok_or_else(|| invalid(input));
        }

        if let Some(args) = lower
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(args, false).ok_or_else(|| invalid(input));
        }

        match lower.as_str() {
            "white" => Ok(Self::white()),
            "black" => Ok(Self::black()),
            "transparent" => Ok(Self::transparent()),
            _ => Err(invalid(input)),
        }
    }
}

impl FromStr for Rgba {
    type Err = InvalidWatermarkConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({},{},{},{:.3})",
            self.r,
            self.g,
            self.b,
            self.alpha()
        )
    }
}

impl From<Rgba> for image::Rgba<u8> {
    fn from(c: Rgba) -> Self {
        image::Rgba([c.r, c.g, c.b, c.a])
    }
}

fn invalid(input: &str) -> InvalidWatermarkConfigError {
    InvalidWatermarkConfigError(format!(
        "Color must be #RGB, #RRGGBB, #RRGGBBAA, rgb(), rgba() or a named color, got '{}'",
        input
    ))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => {
            // Each digit doubles: 0xF -> 0xFF
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some(Rgba::new(digit(0)?, digit(1)?, digit(2)?, 255))
        }
        6 => Some(Rgba::new(pair(0)?, pair(2)?, pair(4)?, 255)),
        8 => Some(Rgba::new(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
        _ => None,
    }
}

fn parse_functional(args: &str, with_alpha: bool) -> Option<Rgba> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }

    let channel = |s: &str| -> Option<u8> {
        let v: f32 = s.parse().ok()?;
        if !v.is_finite() || !(0.0..=255.0).contains(&v) {
            return None;
        }
        Some(v.round() as u8)
    };

    let alpha = if with_alpha {
        let a: f32 = parts[3].parse().ok()?;
        if !a.is_finite() || !(0.0..=1.0).contains(&a) {
            return None;
        }
        (a * 255.0).round() as u8
    } else {
        255
    };

    Some(Rgba::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}
