//! Font loading, text metrics and glyph rasterisation.
//!
//! No font is bundled. A [`FontFace`] is loaded from an explicit path, the
//! `FILIGRANE_FONT` environment variable, or the first common system sans-serif
//! font found on disk.
//!
//! # Example
//!
//! ```ignore
//! use filigrane::watermark::text_renderer::FontFace;
//!
//! let font = FontFace::discover(None)?;
//! let width = font.measure("SECRET", 15.0);
//! let mask = font.rasterize("SECRET", 60.0);
//! ```

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use std::path::{Path, PathBuf};

use super::WatermarkError;

/// Environment variable naming a font file to use when none is configured.
pub const FONT_ENV_VAR: &str = "FILIGRANE_FONT";

/// Well-known locations of a sans-serif font.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Padding around rasterised text, in pixels.
const MASK_PADDING: u32 = 2;

/// A loaded font.
#[derive(Clone)]
pub struct FontFace {
    font: FontArc,
    source: Option<PathBuf>,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("source", &self.source)
            .finish()
    }
}

impl FontFace {
    /// Parse font data (TrueType or OpenType).
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, WatermarkError> {
        let font = FontArc::try_from_vec(data)
            .map_err(|e| WatermarkError::Font(format!("Invalid font data: {}", e)))?;
        Ok(Self { font, source: None })
    }

    /// Load a font file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WatermarkError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            WatermarkError::Font(format!("Failed to read font '{}': {}", path.display(), e))
        })?;
        let mut face = Self::from_bytes(data)?;
        face.source = Some(path.to_path_buf());
        Ok(face)
    }

    /// Load `explicit` if given, otherwise `$FILIGRANE_FONT`, otherwise the
    /// first system font candidate that exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, WatermarkError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(FONT_ENV_VAR) {
            if !path.is_empty() {
                return Self::load(path);
            }
        }

        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = Path::new(candidate);
            if path.is_file() {
                match Self::load(path) {
                    Ok(face) => {
                        tracing::debug!(font = %path.display(), "Using system font");
                        return Ok(face);
                    }
                    Err(e) => {
                        tracing::debug!(font = %path.display(), error = %e, "Skipping unusable font");
                    }
                }
            }
        }

        Err(WatermarkError::Font(format!(
            "No font found; set fontPath or {}",
            FONT_ENV_VAR
        )))
    }

    /// File the font was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Advance width of `text` at `font_size` pixels, including kerning.
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(font_size));

        let mut width = 0.0f32;
        let mut prev_glyph: Option<GlyphId> = None;

        for c in text.chars() {
            let glyph_id = scaled.glyph_id(c);
            if let Some(prev) = prev_glyph {
                width += scaled.kern(prev, glyph_id);
            }
            width += scaled.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }

        width
    }

    /// Distance from baseline to the top of the tallest glyph.
    pub fn ascent(&self, font_size: f32) -> f32 {
        self.font.as_scaled(PxScale::from(font_size)).ascent()
    }

    /// Distance from baseline to the bottom of descenders (negative).
    pub fn descent(&self, font_size: f32) -> f32 {
        self.font.as_scaled(PxScale::from(font_size)).descent()
    }

    /// Rasterise `text` at `font_size` pixels into a coverage mask.
    pub fn rasterize(&self, text: &str, font_size: f32) -> TextMask {
        let scale = PxScale::from(font_size);
        let scaled = self.font.as_scaled(scale);

        let advance = self.measure(text, font_size);
        let ascent = scaled.ascent();
        let descent = scaled.descent();

        let width = advance.max(0.0).ceil() as u32 + 2 * MASK_PADDING;
        let height = (ascent - descent).max(0.0).ceil() as u32 + 2 * MASK_PADDING;
        let origin_x = MASK_PADDING as f32;
        let origin_y = MASK_PADDING as f32 + ascent;

        let mut coverage = vec![0.0f32; width as usize * height as usize];

        let mut cursor_x = origin_x;
        let mut prev_glyph: Option<GlyphId> = None;

        for c in text.chars() {
            let glyph_id = scaled.glyph_id(c);
            if let Some(prev) = prev_glyph {
                cursor_x += scaled.kern(prev, glyph_id);
            }

            let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, origin_y));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, c| {
                    let x = px as i32 + bounds.min.x as i32;
                    let y = py as i32 + bounds.min.y as i32;
                    if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                        let idx = y as usize * width as usize + x as usize;
                        coverage[idx] = (coverage[idx] + c).min(1.0);
                    }
                });
            }

            cursor_x += scaled.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }

        TextMask {
            width,
            height,
            origin_x,
            origin_y,
            advance,
            coverage,
        }
    }
}

/// Anti-aliased coverage of one line of text.
///
/// The text origin (left end of the baseline) sits at
/// `(origin_x, origin_y)` inside the mask.
#[derive(Debug, Clone)]
pub struct TextMask {
    pub width: u32,
    pub height: u32,
    pub origin_x: f32,
    pub origin_y: f32,
    /// Advance width of the text.
    pub advance: f32,
    coverage: Vec<f32>,
}

impl TextMask {
    /// Coverage at an integer mask pixel, 0 outside the mask.
    pub fn at(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0.0;
        }
        self.coverage[y as usize * self.width as usize + x as usize]
    }

    /// Bilinear coverage at offset `(u, v)` from the text origin.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        // Pixel centres sit at +0.5
        let sx = u + self.origin_x - 0.5;
        let sy = v + self.origin_y - 0.5;

        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = sx - x0;
        let fy = sy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let c00 = self.at(x0, y0);
        let c10 = self.at(x0 + 1, y0);
        let c01 = self.at(x0, y0 + 1);
        let c11 = self.at(x0 + 1, y0 + 1);

        c00 * (1.0 - fx) * (1.0 - fy) + c10 * fx * (1.0 - fy) + c01 * (1.0 - fx) * fy + c11 * fx * fy
    }

    /// Offsets from the text origin bounding all non-zero coverage:
    /// `(min_u, min_v, max_u, max_v)`.
    pub fn extent(&self) -> (f32, f32, f32, f32) {
        (
            -self.origin_x,
            -self.origin_y,
            self.width as f32 - self.origin_x,
            self.height as f32 - self.origin_y,
        )
    }

    pub fn is_blank(&self) -> bool {
        self.coverage.iter().all(|c| *c <= 0.0)
    }
}
