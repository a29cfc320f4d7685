//! Surface sizing against the host layout.

use async_trait::async_trait;
use std::collections::HashMap;

use super::image_fetcher::ImageMetadata;
use super::LayoutUnresolvedError;

/// Fixed oversampling factor between logical and physical pixels.
pub const DEVICE_PIXEL_MULTIPLIER: u32 = 4;

/// Largest pixel buffer a surface may allocate (16384 x 16384).
pub const MAX_SURFACE_PIXELS: u64 = 1 << 28;

/// Logical size of the drawing surface plus its oversampling factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDimensions {
    pub logical_width: f32,
    pub logical_height: f32,
    pub device_pixel_multiplier: u32,
}

impl SurfaceDimensions {
    /// Width of the pixel buffer.
    pub fn physical_width(&self) -> u32 {
        to_physical(self.logical_width, self.device_pixel_multiplier)
    }

    /// Height of the pixel buffer.
    pub fn physical_height(&self) -> u32 {
        to_physical(self.logical_height, self.device_pixel_multiplier)
    }
}

fn to_physical(logical: f32, multiplier: u32) -> u32 {
    (logical * multiplier as f32).round().max(1.0) as u32
}

/// Compute the surface size for a host element of `host_width` logical pixels,
/// preserving the image's aspect ratio.
///
/// `element` names the placeholder in error reports.
pub fn compute_dimensions(
    element: &str,
    host_width: f32,
    metadata: &ImageMetadata,
) -> Result<SurfaceDimensions, LayoutUnresolvedError> {
    if !host_width.is_finite() || host_width <= 0.0 {
        return Err(LayoutUnresolvedError::new(
            element,
            format!("host element width must be > 0, got {}", host_width),
        ));
    }

    if metadata.intrinsic_width == 0 || metadata.intrinsic_height == 0 {
        return Err(LayoutUnresolvedError::new(
            element,
            format!(
                "image has degenerate intrinsic size {}x{}",
                metadata.intrinsic_width, metadata.intrinsic_height
            ),
        ));
    }

    let logical_width = host_width;
    let logical_height =
        logical_width * metadata.intrinsic_height as f32 / metadata.intrinsic_width as f32;

    let multiplier = DEVICE_PIXEL_MULTIPLIER as f64;
    let physical_width = (logical_width as f64 * multiplier).round().max(1.0);
    let physical_height = (logical_height as f64 * multiplier).round().max(1.0);
    if !physical_height.is_finite() || physical_width * physical_height > MAX_SURFACE_PIXELS as f64
    {
        return Err(LayoutUnresolvedError::new(
            element,
            format!(
                "surface of {}x{} physical pixels exceeds the limit of {}",
                physical_width, physical_height, MAX_SURFACE_PIXELS
            ),
        ));
    }

    Ok(SurfaceDimensions {
        logical_width,
        logical_height,
        device_pixel_multiplier: DEVICE_PIXEL_MULTIPLIER,
    })
}

/// Host layout query: the rendered width of an element, if known.
#[async_trait]
pub trait LayoutQuery: Send + Sync {
    async fn element_width(&self, element: &str) -> Option<f32>;
}

/// Layout that reports the same width for every element, with optional
/// per-element overrides.
#[derive(Debug, Clone, Default)]
pub struct FixedLayout {
    default_width: Option<f32>,
    overrides: HashMap<String, f32>,
}

impl FixedLayout {
    pub fn new(width: f32) -> Self {
        Self {
            default_width: Some(width),
            overrides: HashMap::new(),
        }
    }

    /// A layout that cannot resolve any element.
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, element: impl Into<String>, width: f32) -> Self {
        self.overrides.insert(element.into(), width);
        self
    }
}

#[async_trait]
impl LayoutQuery for FixedLayout {
    async fn element_width(&self, element: &str) -> Option<f32> {
        self.overrides.get(element).copied().or(self.default_width)
    }
}
