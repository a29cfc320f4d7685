//! Tiled text watermarks composited over a background image.
//!
//! A [`WatermarkView`] resolves its background image, sizes a drawing surface
//! to the host element (4x oversampled), draws the image and then repeats the
//! watermark text across the surface on a rotated grid. The composited
//! surface can be exported once and shown in an image viewer.
//!
//! # Configuration Example
//!
//! ```yaml
//! imageUrl: "https://cdn.example.com/poster.png"
//! lazyImageUrl: "https://cdn.example.com/spinner.gif"
//! content: "CONFIDENTIAL"
//! contentColor: "rgba(255,255,255,.5)"
//! contentSize: 15
//! level: 60
//! vertical: 150
//! lazy: true
//! coverage: classic
//! ```
//!
//! # Pipeline
//!
//! ```text
//! on_ready ──► LazyTrigger (lazy only)
//!                 │
//!                 ▼
//!          resolve image ──► query element width ──► compute dimensions
//!                                                        │
//!                                                        ▼
//!                               composite (background + tile grid)
//!                                                        │
//! request_preview ──► ExportCache::export_once ──► ImageViewer
//! ```

pub mod canvas;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod export;
pub mod image_fetcher;
pub mod lazy;
pub mod lifecycle;
pub mod sizer;
pub mod text_renderer;
pub mod tiling;
pub mod view;

// Re-export main types for convenience
pub use canvas::{DrawSurface, RasterSurface, RasterSurfaceProvider, SurfaceProvider};
pub use color::Rgba;
pub use compositor::{composite, CompositedSurface, SurfaceId};
pub use config::{WatermarkConfig, WatermarkOptions, DEFAULT_IMAGE_URL};
pub use error::{
    ExportError, ImageFetchError, InvalidWatermarkConfigError, LayoutUnresolvedError,
    WatermarkError,
};
pub use export::{
    ExportArtifact, ExportCache, PngFileExporter, SurfaceExporter, DEFAULT_MAX_ARTIFACTS,
};
pub use image_fetcher::{
    ImageFetcherConfig, ImageMetadata, ImageMetadataResolver, ImageSource, SourceImageResolver,
};
pub use lazy::{
    AlwaysVisible, ChannelVisibility, IntersectionEvent, LazyTrigger, TriggerOutcome,
    VisibilityObserver,
};
pub use lifecycle::Liveness;
pub use sizer::{
    compute_dimensions, FixedLayout, LayoutQuery, SurfaceDimensions, DEVICE_PIXEL_MULTIPLIER,
    MAX_SURFACE_PIXELS,
};
pub use text_renderer::{FontFace, TextMask};
pub use tiling::{compute_tile_grid, CoverageMode, Tile, TileGrid, TileParams, MAX_TILES};
pub use view::{
    CommandViewer, ImageViewer, LogViewer, RenderOutcome, ViewState, WatermarkHost,
    WatermarkView,
};
