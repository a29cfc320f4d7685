//! Compositing of the background image and the tiled text watermark.
//!
//! # Example
//!
//! ```ignore
//! use filigrane::watermark::compositor::composite;
//!
//! let surface = provider.create();
//! let composited = composite(&config, &metadata, &dimensions, surface)?;
//! assert_eq!(composited.pixels().width(), dimensions.physical_width());
//! ```

use image::RgbaImage;
use std::fmt;
use uuid::Uuid;

use super::canvas::DrawSurface;
use super::config::WatermarkConfig;
use super::image_fetcher::ImageMetadata;
use super::sizer::SurfaceDimensions;
use super::tiling::{compute_tile_grid, TileParams};
use super::InvalidWatermarkConfigError;

/// Identity of one composited surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The finished pixel buffer of one render.
pub struct CompositedSurface {
    id: SurfaceId,
    dimensions: SurfaceDimensions,
    tile_count: usize,
    pixels: RgbaImage,
}

impl CompositedSurface {
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn dimensions(&self) -> &SurfaceDimensions {
        &self.dimensions
    }

    /// Number of text instances drawn.
    pub fn tile_count(&self) -> usize {
        self.tile_count
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl fmt::Debug for CompositedSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositedSurface")
            .field("id", &self.id)
            .field("dimensions", &self.dimensions)
            .field("tile_count", &self.tile_count)
            .finish()
    }
}

/// Draw the background and the watermark grid onto `surface`.
///
/// The tile grid is computed (and validated) before the first drawing call,
/// so a degenerate configuration leaves the surface untouched.
pub fn composite(
    config: &WatermarkConfig,
    metadata: &ImageMetadata,
    dimensions: &SurfaceDimensions,
    mut surface: Box<dyn DrawSurface>,
) -> Result<CompositedSurface, InvalidWatermarkConfigError> {
    config.validate()?;

    let text_width = surface.measure_text(&config.text, config.font_size_px);
    let grid = compute_tile_grid(&TileParams {
        surface_width: dimensions.logical_width,
        surface_height: dimensions.logical_height,
        text_width,
        text_height: config.font_size_px,
        horizontal_gap: config.horizontal_gap_px,
        vertical_gap: config.vertical_gap_px,
        angle_degrees: config.angle_degrees,
        coverage: config.coverage,
    })?;

    surface.allocate(dimensions.physical_width(), dimensions.physical_height());
    surface.set_scale(dimensions.device_pixel_multiplier as f32);
    surface.draw_image(
        &metadata.decoded,
        0.0,
        0.0,
        dimensions.logical_width,
        dimensions.logical_height,
    );

    surface.set_fill_color(config.text_color);
    surface.set_font_size(config.font_size_px);

    let rotation = grid.frame().angle_radians;
    for tile in &grid {
        surface.fill_text(&config.text, tile.origin.x, tile.origin.y, rotation);
    }

    let id = SurfaceId::new();
    tracing::debug!(
        surface_id = %id,
        tiles = grid.len(),
        columns = grid.columns(),
        text_width = text_width,
        "Watermark composited"
    );

    Ok(CompositedSurface {
        id,
        dimensions: *dimensions,
        tile_count: grid.len(),
        pixels: surface.into_pixels(),
    })
}
