// Test harness for integration tests
// Hand-written fakes of the host collaborators a WatermarkView renders through

use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

use filigrane::watermark::{
    AlwaysVisible, CompositedSurface, DrawSurface, ExportCache, ExportError, FixedLayout,
    ImageFetchError, ImageMetadata, ImageMetadataResolver, ImageViewer, Rgba, SurfaceExporter,
    SurfaceProvider, VisibilityObserver, WatermarkError, WatermarkHost,
};

/// Every call a RecordingSurface received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Allocate(u32, u32),
    Scale(f32),
    Image { x: f32, y: f32, width: f32, height: f32 },
    FillColor(Rgba),
    FontSize(f32),
    Text { text: String, x: f32, y: f32, rotation: f32 },
}

/// Surface that records calls. Text measures 0.6 em per character.
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<DrawCall>>>,
    width: u32,
    height: u32,
}

impl DrawSurface for RecordingSurface {
    fn allocate(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.calls.lock().push(DrawCall::Allocate(width, height));
    }

    fn set_scale(&mut self, scale: f32) {
        self.calls.lock().push(DrawCall::Scale(scale));
    }

    fn draw_image(&mut self, _image: &DynamicImage, x: f32, y: f32, width: f32, height: f32) {
        self.calls.lock().push(DrawCall::Image {
            x,
            y,
            width,
            height,
        });
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.calls.lock().push(DrawCall::FillColor(color));
    }

    fn set_font_size(&mut self, font_size: f32) {
        self.calls.lock().push(DrawCall::FontSize(font_size));
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * 0.6
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, rotation: f32) {
        self.calls.lock().push(DrawCall::Text {
            text: text.to_string(),
            x,
            y,
            rotation,
        });
    }

    fn into_pixels(self: Box<Self>) -> RgbaImage {
        RgbaImage::new(self.width, self.height)
    }
}

/// Hands out RecordingSurfaces that share one call log.
#[derive(Default)]
pub struct RecordingProvider {
    pub calls: Arc<Mutex<Vec<DrawCall>>>,
    pub created: AtomicUsize,
}

impl RecordingProvider {
    pub fn calls(&self) -> Vec<DrawCall> {
        self.calls.lock().clone()
    }

    pub fn text_calls(&self) -> Vec<(String, f32, f32, f32)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                DrawCall::Text {
                    text,
                    x,
                    y,
                    rotation,
                } => Some((text.clone(), *x, *y, *rotation)),
                _ => None,
            })
            .collect()
    }
}

impl SurfaceProvider for RecordingProvider {
    fn create(&self) -> Box<dyn DrawSurface> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(RecordingSurface {
            calls: Arc::clone(&self.calls),
            width: 0,
            height: 0,
        })
    }
}

pub fn solid_image(width: u32, height: u32) -> ImageMetadata {
    ImageMetadata::from_image(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([30, 60, 90, 255]),
    )))
}

/// Resolves every URL to the same image.
pub struct StaticResolver {
    metadata: ImageMetadata,
    pub calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            metadata: solid_image(width, height),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageMetadataResolver for StaticResolver {
    async fn resolve(&self, _url: &str) -> Result<ImageMetadata, ImageFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metadata.clone())
    }
}

/// Always fails, as a host reporting a network error would.
#[derive(Default)]
pub struct FailingResolver {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ImageMetadataResolver for FailingResolver {
    async fn resolve(&self, url: &str) -> Result<ImageMetadata, ImageFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ImageFetchError::new(url, "connection reset"))
    }
}

/// Suspends each resolve until the test releases it.
pub struct GatedResolver {
    gate: Mutex<Option<oneshot::Receiver<Result<ImageMetadata, ImageFetchError>>>>,
    pub started: AtomicBool,
}

impl GatedResolver {
    pub fn new() -> (Self, oneshot::Sender<Result<ImageMetadata, ImageFetchError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                gate: Mutex::new(Some(rx)),
                started: AtomicBool::new(false),
            },
            tx,
        )
    }
}

#[async_trait]
impl ImageMetadataResolver for GatedResolver {
    async fn resolve(&self, url: &str) -> Result<ImageMetadata, ImageFetchError> {
        self.started.store(true, Ordering::SeqCst);
        let rx = self.gate.lock().take();
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ImageFetchError::new(url, "gate dropped"))),
            None => Err(ImageFetchError::new(url, "resolver already used")),
        }
    }
}

/// Exporter that counts conversions and can be told to fail.
#[derive(Default)]
pub struct CountingExporter {
    pub conversions: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl SurfaceExporter for CountingExporter {
    async fn export(&self, surface: &CompositedSurface) -> Result<String, ExportError> {
        self.conversions.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExportError::Conversion {
                surface: surface.id(),
                reason: "host export failed".to_string(),
            });
        }
        Ok(format!("memory://{}.png", surface.id()))
    }
}

/// Viewer that records every list it was asked to show.
#[derive(Default)]
pub struct RecordingViewer {
    pub shown: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl ImageViewer for RecordingViewer {
    async fn preview(&self, urls: Vec<String>) -> Result<(), WatermarkError> {
        self.shown.lock().push(urls);
        Ok(())
    }
}

/// A host wired with fakes, keeping typed handles for assertions.
pub struct TestHost {
    pub surfaces: Arc<RecordingProvider>,
    pub exporter: Arc<CountingExporter>,
    pub viewer: Arc<RecordingViewer>,
    pub host: WatermarkHost,
}

impl TestHost {
    pub fn new(resolver: Arc<dyn ImageMetadataResolver>, host_width: f32) -> Self {
        Self::with_visibility(resolver, host_width, Arc::new(AlwaysVisible))
    }

    pub fn with_visibility(
        resolver: Arc<dyn ImageMetadataResolver>,
        host_width: f32,
        visibility: Arc<dyn VisibilityObserver>,
    ) -> Self {
        let surfaces = Arc::new(RecordingProvider::default());
        let exporter = Arc::new(CountingExporter::default());
        let viewer = Arc::new(RecordingViewer::default());

        let host = WatermarkHost {
            resolver,
            layout: Arc::new(FixedLayout::new(host_width)),
            visibility,
            surfaces: surfaces.clone(),
            exports: Arc::new(ExportCache::new(exporter.clone())),
            viewer: viewer.clone(),
        };

        Self {
            surfaces,
            exporter,
            viewer,
            host,
        }
    }
}
