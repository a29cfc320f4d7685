//! Watermark error types.
//!
//! Each failure class of the render pipeline has its own type so callers can
//! match on exactly what went wrong. [`WatermarkError`] is the umbrella the
//! pipeline itself returns.

use thiserror::Error;

use super::compositor::SurfaceId;

/// The background image could not be fetched or decoded.
#[derive(Debug, Clone, Error)]
#[error("Failed to fetch background image '{url}': {reason}")]
pub struct ImageFetchError {
    pub url: String,
    pub reason: String,
}

impl ImageFetchError {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// The host could not report a usable width for the placeholder element.
#[derive(Debug, Clone, Error)]
#[error("Layout unresolved for '{element}': {reason}")]
pub struct LayoutUnresolvedError {
    pub element: String,
    pub reason: String,
}

impl LayoutUnresolvedError {
    pub fn new(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            reason: reason.into(),
        }
    }
}

/// Tiling or styling parameters that cannot produce a finite, non-empty grid.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid watermark configuration: {0}")]
pub struct InvalidWatermarkConfigError(pub String);

/// The export primitive failed, or there was nothing to export.
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    #[error("Surface has not been composited yet")]
    NotRendered,

    #[error("Failed to export surface {surface}: {reason}")]
    Conversion { surface: SurfaceId, reason: String },
}

/// Errors surfaced by the render pipeline.
#[derive(Debug, Clone, Error)]
pub enum WatermarkError {
    #[error(transparent)]
    ImageFetch(#[from] ImageFetchError),

    #[error(transparent)]
    LayoutUnresolved(#[from] LayoutUnresolvedError),

    #[error(transparent)]
    InvalidConfig(#[from] InvalidWatermarkConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Font unavailable: {0}")]
    Font(String),

    #[error("Image viewer failed: {0}")]
    Viewer(String),
}
