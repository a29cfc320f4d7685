//! Tile layout for rotated, repeating text watermarks.
//!
//! The grid is laid out in a rotated frame whose origin sits at
//! `(-width / 2, height / 2)` of the surface, rotated by the configured angle
//! (default -45°, text reading bottom-left to top-right). Every tile carries
//! both its rotated-frame coordinates and its absolute draw origin on the
//! surface, so drawing never depends on a mutable transform stack.
//!
//! # Coverage modes
//!
//! - **Classic**: `ceil(width / text_width)` columns spaced
//!   `text_width + horizontal_gap` apart. Each column gets a seed tile at
//!   `y = vertical_gap` followed by `ceil(height / vertical_gap)` tiles at
//!   `y = j * vertical_gap`, so a column holds `vertical_count + 1` tiles and
//!   the seed duplicates row 1.
//! - **Diagonal**: the surface corners are mapped into the rotated frame and
//!   the smallest column/row ranges reaching every edge are emitted, with no
//!   duplicated row.
//!
//! # Example
//!
//! ```ignore
//! use filigrane::watermark::tiling::{compute_tile_grid, CoverageMode, TileParams};
//!
//! let grid = compute_tile_grid(&TileParams {
//!     surface_width: 400.0,
//!     surface_height: 200.0,
//!     text_width: 54.0,
//!     text_height: 15.0,
//!     horizontal_gap: 60.0,
//!     vertical_gap: 150.0,
//!     angle_degrees: -45.0,
//!     coverage: CoverageMode::Classic,
//! })?;
//! assert_eq!(grid.len(), 8 * (2 + 1));
//! ```

use serde::{Deserialize, Serialize};

use super::InvalidWatermarkConfigError;

/// Upper bound on tiles in one grid.
pub const MAX_TILES: usize = 1_000_000;

/// How the tile grid is sized against the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageMode {
    /// Nested-loop grid with a seed row per column
    #[default]
    Classic,
    /// Minimal grid spanning the rotated bounding box of the surface
    Diagonal,
}

/// A point in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Inputs to the tile layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileParams {
    pub surface_width: f32,
    pub surface_height: f32,
    /// Measured advance width of the watermark text.
    pub text_width: f32,
    /// Vertical extent of one line of text (the font size).
    pub text_height: f32,
    pub horizontal_gap: f32,
    pub vertical_gap: f32,
    pub angle_degrees: f32,
    pub coverage: CoverageMode,
}

/// One text instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    /// Baseline-left draw origin in the rotated frame.
    pub x: f32,
    pub y: f32,
    /// The same origin in untransformed surface coordinates.
    pub origin: Point,
}

/// Rotated frame: translate to `reference`, then rotate by `angle`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub reference: Point,
    pub angle_radians: f32,
    sin: f32,
    cos: f32,
}

impl Frame {
    pub fn new(reference: Point, angle_radians: f32) -> Self {
        let (sin, cos) = angle_radians.sin_cos();
        Self {
            reference,
            angle_radians,
            sin,
            cos,
        }
    }

    /// Map a rotated-frame point onto the surface.
    pub fn to_surface(&self, x: f32, y: f32) -> Point {
        Point::new(
            self.reference.x + x * self.cos - y * self.sin,
            self.reference.y + x * self.sin + y * self.cos,
        )
    }

    /// Map a surface point into the rotated frame.
    pub fn to_frame(&self, p: Point) -> Point {
        let dx = p.x - self.reference.x;
        let dy = p.y - self.reference.y;
        Point::new(dx * self.cos + dy * self.sin, -dx * self.sin + dy * self.cos)
    }
}

/// Ordered tile positions for one surface.
#[derive(Debug, Clone)]
pub struct TileGrid {
    frame: Frame,
    columns: usize,
    rows_per_column: usize,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Tiles emitted per column (including the seed row in classic mode).
    pub fn rows_per_column(&self) -> usize {
        self.rows_per_column
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl<'a> IntoIterator for &'a TileGrid {
    type Item = &'a Tile;
    type IntoIter = std::slice::Iter<'a, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}

/// Pivot of the rotated frame: the left edge at half the surface width
/// outward, vertically centred.
pub fn rotation_reference(surface_width: f32, surface_height: f32) -> Point {
    Point::new(-(surface_width / 2.0), surface_height / 2.0)
}

/// Check that the parameters produce a finite, non-empty grid.
pub fn validate_params(params: &TileParams) -> Result<(), InvalidWatermarkConfigError> {
    let positive = |v: f32| v.is_finite() && v > 0.0;

    if !positive(params.surface_width) || !positive(params.surface_height) {
        return Err(InvalidWatermarkConfigError(format!(
            "Surface must have positive dimensions, got {}x{}",
            params.surface_width, params.surface_height
        )));
    }

    if !positive(params.text_width) {
        return Err(InvalidWatermarkConfigError(format!(
            "Measured text width must be > 0, got {}",
            params.text_width
        )));
    }

    if !positive(params.vertical_gap) {
        return Err(InvalidWatermarkConfigError(format!(
            "Vertical gap must be > 0, got {}",
            params.vertical_gap
        )));
    }

    if !params.horizontal_gap.is_finite() || !params.angle_degrees.is_finite() {
        return Err(InvalidWatermarkConfigError(
            "Horizontal gap and rotation angle must be finite".to_string(),
        ));
    }

    if params.coverage == CoverageMode::Diagonal {
        if !positive(params.text_width + params.horizontal_gap) {
            return Err(InvalidWatermarkConfigError(format!(
                "Column step (text width {} + gap {}) must be > 0",
                params.text_width, params.horizontal_gap
            )));
        }
        if !params.text_height.is_finite() || params.text_height < 0.0 {
            return Err(InvalidWatermarkConfigError(format!(
                "Text height must be finite and >= 0, got {}",
                params.text_height
            )));
        }
    }

    Ok(())
}

/// Compute the tile grid covering the surface.
///
/// Fails with [`InvalidWatermarkConfigError`] before emitting anything when
/// the text width or vertical gap is degenerate, or when the grid would exceed
/// [`MAX_TILES`].
pub fn compute_tile_grid(params: &TileParams) -> Result<TileGrid, InvalidWatermarkConfigError> {
    validate_params(params)?;

    let frame = Frame::new(
        rotation_reference(params.surface_width, params.surface_height),
        params.angle_degrees.to_radians(),
    );

    let (columns, rows_per_column, positions) = match params.coverage {
        CoverageMode::Classic => classic_positions(params)?,
        CoverageMode::Diagonal => diagonal_positions(params, &frame)?,
    };

    let tiles = positions
        .into_iter()
        .map(|(x, y)| Tile {
            x,
            y,
            origin: frame.to_surface(x, y),
        })
        .collect();

    Ok(TileGrid {
        frame,
        columns,
        rows_per_column,
        tiles,
    })
}

type Positions = (usize, usize, Vec<(f32, f32)>);

fn check_tile_count(columns: usize, rows: usize) -> Result<usize, InvalidWatermarkConfigError> {
    match columns.checked_mul(rows) {
        Some(total) if total <= MAX_TILES => Ok(total),
        _ => Err(InvalidWatermarkConfigError(format!(
            "Tile grid of {} columns x {} rows exceeds the limit of {} tiles",
            columns, rows, MAX_TILES
        ))),
    }
}

fn classic_positions(params: &TileParams) -> Result<Positions, InvalidWatermarkConfigError> {
    let level_count = (params.surface_width / params.text_width).ceil() as usize;
    let vertical_count = (params.surface_height / params.vertical_gap).ceil() as usize;
    let rows = vertical_count.saturating_add(1);
    let total = check_tile_count(level_count, rows)?;

    let mut positions = Vec::with_capacity(total);
    for i in 0..level_count {
        let level_offset = i as f32 * (params.text_width + params.horizontal_gap);

        // Seed row, then the regular rows from y = 0
        positions.push((level_offset, params.vertical_gap));
        for j in 0..vertical_count {
            positions.push((level_offset, j as f32 * params.vertical_gap));
        }
    }

    Ok((level_count, rows, positions))
}

fn diagonal_positions(
    params: &TileParams,
    frame: &Frame,
) -> Result<Positions, InvalidWatermarkConfigError> {
    let w = params.surface_width;
    let h = params.surface_height;
    let corners = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(0.0, h),
        Point::new(w, h),
    ]
    .map(|c| frame.to_frame(c));

    let min_x = corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let max_x = corners.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = corners.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

    let step_x = params.text_width + params.horizontal_gap;
    let step_y = params.vertical_gap;

    // A column at x spans [x, x + text_width]; a row at y spans roughly
    // [y - text_height, y + text_height] around its baseline.
    let first_col = ((min_x - params.text_width) / step_x).ceil() as i64;
    let last_col = (max_x / step_x).floor() as i64;
    let first_row = ((min_y - params.text_height) / step_y).ceil() as i64;
    let last_row = ((max_y + params.text_height) / step_y).floor() as i64;

    let columns = (last_col - first_col + 1).max(0) as usize;
    let rows = (last_row - first_row + 1).max(0) as usize;
    let total = check_tile_count(columns, rows)?;

    let mut positions = Vec::with_capacity(total);
    for i in first_col..=last_col {
        let x = i as f32 * step_x;
        for j in first_row..=last_row {
            positions.push((x, j as f32 * step_y));
        }
    }

    Ok((columns, rows, positions))
}
