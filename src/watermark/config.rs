//! Watermark configuration types.
//!
//! [`WatermarkOptions`] is the loosely-typed option surface a host supplies
//! (every field optional, camelCase names). [`WatermarkConfig`] is the
//! validated, immutable form one composited surface is rendered from.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::tiling::CoverageMode;
use super::{InvalidWatermarkConfigError, Rgba};

/// Placeholder shown (and used as background) when the host supplies none.
pub const DEFAULT_IMAGE_URL: &str = "https://s1.ax1x.com/2022/05/08/OlbiFI.gif";

// Default values
fn default_image_url() -> String {
    DEFAULT_IMAGE_URL.to_string()
}

fn default_content() -> String {
    "do not redistribute, piracy will be prosecuted".to_string()
}

fn default_content_color() -> String {
    "rgba(255,255,255,.5)".to_string()
}

fn default_content_size() -> f32 {
    15.0
}

fn default_level() -> f32 {
    60.0
}

fn default_vertical() -> f32 {
    150.0
}

fn default_lazy() -> bool {
    true
}

fn default_angle() -> f32 {
    -45.0
}

/// Host-facing watermark options.
///
/// ```yaml
/// imageUrl: "https://cdn.example.com/poster.png"
/// content: "CONFIDENTIAL"
/// contentColor: "rgba(255,255,255,.5)"
/// contentSize: 15
/// level: 60
/// vertical: 150
/// lazy: false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkOptions {
    /// Background image source
    #[serde(default = "default_image_url")]
    pub image_url: String,

    /// Image shown while the composite is loading
    #[serde(default = "default_image_url")]
    pub lazy_image_url: String,

    /// Watermark text
    #[serde(default = "default_content")]
    pub content: String,

    /// Text colour (see [`Rgba::parse`])
    #[serde(default = "default_content_color")]
    pub content_color: String,

    /// Font size in logical pixels (default: 15)
    #[serde(default = "default_content_size")]
    pub content_size: f32,

    /// Horizontal gap between tiles in logical pixels (default: 60)
    #[serde(default = "default_level")]
    pub level: f32,

    /// Vertical gap between tile rows in logical pixels (default: 150)
    #[serde(default = "default_vertical")]
    pub vertical: f32,

    /// Defer compositing until the placeholder becomes visible (default: true)
    #[serde(default = "default_lazy")]
    pub lazy: bool,

    /// Rotation of the tile grid in degrees (default: -45)
    #[serde(default = "default_angle")]
    pub angle: f32,

    /// Tile coverage strategy (default: classic)
    #[serde(default)]
    pub coverage: CoverageMode,

    /// TrueType/OpenType font file; system fonts are probed when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            image_url: default_image_url(),
            lazy_image_url: default_image_url(),
            content: default_content(),
            content_color: default_content_color(),
            content_size: default_content_size(),
            level: default_level(),
            vertical: default_vertical(),
            lazy: default_lazy(),
            angle: default_angle(),
            coverage: CoverageMode::default(),
            font_path: None,
        }
    }
}

impl WatermarkOptions {
    /// Validate the options and build the immutable render configuration.
    pub fn to_config(&self) -> Result<WatermarkConfig, InvalidWatermarkConfigError> {
        let config = WatermarkConfig {
            text: self.content.clone(),
            text_color: Rgba::parse(&self.content_color)?,
            font_size_px: self.content_size,
            horizontal_gap_px: self.level,
            vertical_gap_px: self.vertical,
            lazy: self.lazy,
            angle_degrees: self.angle,
            coverage: self.coverage,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Validated watermark configuration, immutable for the lifetime of a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkConfig {
    pub text: String,
    pub text_color: Rgba,
    pub font_size_px: f32,
    pub horizontal_gap_px: f32,
    pub vertical_gap_px: f32,
    pub lazy: bool,
    pub angle_degrees: f32,
    pub coverage: CoverageMode,
}

impl WatermarkConfig {
    /// Reject parameters that would make the tile loops empty or unbounded.
    pub fn validate(&self) -> Result<(), InvalidWatermarkConfigError> {
        if self.text.is_empty() {
            return Err(InvalidWatermarkConfigError(
                "Watermark text cannot be empty".to_string(),
            ));
        }

        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(InvalidWatermarkConfigError(format!(
                "Font size must be a finite value > 0, got {}",
                self.font_size_px
            )));
        }

        if !self.vertical_gap_px.is_finite() || self.vertical_gap_px <= 0.0 {
            return Err(InvalidWatermarkConfigError(format!(
                "Vertical gap must be a finite value > 0, got {}",
                self.vertical_gap_px
            )));
        }

        if !self.horizontal_gap_px.is_finite() {
            return Err(InvalidWatermarkConfigError(format!(
                "Horizontal gap must be finite, got {}",
                self.horizontal_gap_px
            )));
        }

        if !self.angle_degrees.is_finite() {
            return Err(InvalidWatermarkConfigError(format!(
                "Rotation angle must be finite, got {}",
                self.angle_degrees
            )));
        }

        Ok(())
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: default_content(),
            text_color: Rgba::new(255, 255, 255, 128),
            font_size_px: default_content_size(),
            horizontal_gap_px: default_level(),
            vertical_gap_px: default_vertical(),
            lazy: default_lazy(),
            angle_degrees: default_angle(),
            coverage: CoverageMode::default(),
        }
    }
}
