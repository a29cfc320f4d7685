//! The watermark view: ties the render pipeline to one placeholder element.
//!
//! A view is created from [`WatermarkOptions`] and a [`WatermarkHost`] bundling
//! the host collaborators. [`WatermarkView::on_ready`] starts either the lazy
//! observation or the render right away; [`WatermarkView::request_preview`]
//! exports the composited surface once and hands it to the image viewer.
//!
//! Each stage of the pipeline produces a new value consumed by the next one
//! (metadata, dimensions, composited surface, artifact). The only shared
//! state is the view's [`ViewState`], written only while the view is alive.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use super::canvas::SurfaceProvider;
use super::compositor::{composite, CompositedSurface};
use super::config::{WatermarkConfig, WatermarkOptions};
use super::export::{ExportArtifact, ExportCache};
use super::image_fetcher::{ImageMetadata, ImageMetadataResolver};
use super::lazy::{LazyTrigger, TriggerOutcome, VisibilityObserver};
use super::lifecycle::Liveness;
use super::sizer::{compute_dimensions, LayoutQuery};
use super::{ExportError, InvalidWatermarkConfigError, LayoutUnresolvedError, WatermarkError};

/// Host utility that displays a list of images.
#[async_trait]
pub trait ImageViewer: Send + Sync {
    async fn preview(&self, urls: Vec<String>) -> Result<(), WatermarkError>;
}

/// Viewer that only logs what would be shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogViewer;

#[async_trait]
impl ImageViewer for LogViewer {
    async fn preview(&self, urls: Vec<String>) -> Result<(), WatermarkError> {
        tracing::info!(urls = ?urls, "Preview requested");
        Ok(())
    }
}

/// Viewer that launches an external program with the image paths appended.
#[derive(Debug, Clone)]
pub struct CommandViewer {
    program: String,
    args: Vec<String>,
}

impl CommandViewer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl ImageViewer for CommandViewer {
    async fn preview(&self, urls: Vec<String>) -> Result<(), WatermarkError> {
        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .args(&urls)
            .spawn()
            .map_err(|e| WatermarkError::Viewer(format!("Failed to launch '{}': {}", self.program, e)))?;

        tracing::info!(program = %self.program, pid = ?child.id(), urls = ?urls, "Viewer launched");
        Ok(())
    }
}

/// Host collaborators a view renders through.
#[derive(Clone)]
pub struct WatermarkHost {
    pub resolver: Arc<dyn ImageMetadataResolver>,
    pub layout: Arc<dyn LayoutQuery>,
    pub visibility: Arc<dyn VisibilityObserver>,
    pub surfaces: Arc<dyn SurfaceProvider>,
    pub exports: Arc<ExportCache>,
    pub viewer: Arc<dyn ImageViewer>,
}

/// Lifecycle of a view.
#[derive(Debug, Clone)]
pub enum ViewState {
    /// Created, `on_ready` not yet called.
    Idle,
    /// Waiting for the placeholder to become visible.
    Observing,
    /// Render pipeline running.
    Loading,
    Rendered(Arc<CompositedSurface>),
    /// Render failed; the loading image stays up.
    Failed(WatermarkError),
    Destroyed,
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::Observing => "observing",
            ViewState::Loading => "loading",
            ViewState::Rendered(_) => "rendered",
            ViewState::Failed(_) => "failed",
            ViewState::Destroyed => "destroyed",
        }
    }
}

/// Result of [`WatermarkView::on_ready`] that is not an error.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    Rendered(Arc<CompositedSurface>),
    /// The visibility observer went away before the placeholder was seen.
    NotVisible,
    /// The view was destroyed while the pipeline was suspended.
    Abandoned,
    /// `on_ready` had already been called.
    AlreadyStarted,
}

/// One watermarked image.
pub struct WatermarkView {
    options: WatermarkOptions,
    config: WatermarkConfig,
    image_element: String,
    canvas_element: String,
    host: WatermarkHost,
    state: Mutex<ViewState>,
    liveness: Liveness,
}

impl WatermarkView {
    /// Validate `options` and create an idle view.
    pub fn new(
        options: WatermarkOptions,
        host: WatermarkHost,
    ) -> Result<Self, InvalidWatermarkConfigError> {
        let config = options.to_config()?;
        let suffix = Uuid::new_v4();

        Ok(Self {
            options,
            config,
            image_element: format!("image-{}", suffix),
            canvas_element: format!("canvas-{}", suffix),
            host,
            state: Mutex::new(ViewState::Idle),
            liveness: Liveness::new(),
        })
    }

    pub fn options(&self) -> &WatermarkOptions {
        &self.options
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Id of the placeholder image element.
    pub fn image_element(&self) -> &str {
        &self.image_element
    }

    /// Id of the drawing surface element.
    pub fn canvas_element(&self) -> &str {
        &self.canvas_element
    }

    pub fn state(&self) -> ViewState {
        self.state.lock().clone()
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Composited surface, once rendered.
    pub fn surface(&self) -> Option<Arc<CompositedSurface>> {
        match &*self.state.lock() {
            ViewState::Rendered(surface) => Some(Arc::clone(surface)),
            _ => None,
        }
    }

    /// Image to show in place of the composite: the loading image until the
    /// render succeeds, nothing afterwards.
    pub fn display_url(&self) -> Option<&str> {
        match &*self.state.lock() {
            ViewState::Rendered(_) | ViewState::Destroyed => None,
            _ => Some(self.options.lazy_image_url.as_str()),
        }
    }

    /// Start the view: observe visibility when lazy, otherwise render now.
    pub async fn on_ready(&self) -> Result<RenderOutcome, WatermarkError> {
        {
            let mut state = self.state.lock();
            if !self.liveness.is_alive() {
                return Ok(RenderOutcome::Abandoned);
            }
            if !matches!(*state, ViewState::Idle) {
                return Ok(RenderOutcome::AlreadyStarted);
            }
            *state = if self.config.lazy {
                ViewState::Observing
            } else {
                ViewState::Loading
            };
        }

        if !self.config.lazy {
            return self.render().await;
        }

        let trigger = LazyTrigger::new(Arc::clone(&self.host.visibility));
        match trigger
            .observe(&self.image_element, &self.liveness, || self.render())
            .await
        {
            TriggerOutcome::Fired(result) => result,
            TriggerOutcome::Disconnected => {
                self.set_state_if_alive(ViewState::Idle);
                Ok(RenderOutcome::NotVisible)
            }
            TriggerOutcome::Cancelled => Ok(RenderOutcome::Abandoned),
        }
    }

    /// Export the composited surface (once) and show it in the viewer.
    pub async fn request_preview(&self) -> Result<ExportArtifact, WatermarkError> {
        let surface = self.surface().ok_or(ExportError::NotRendered)?;

        let artifact = self.host.exports.export_once(&surface).await?;
        if !self.liveness.is_alive() {
            // Torn down while exporting; the artifact has no owner left
            self.host.exports.forget(artifact.source_surface).await;
            return Err(ExportError::NotRendered.into());
        }
        self.host.viewer.preview(vec![artifact.handle.clone()]).await?;

        Ok(artifact)
    }

    /// Tear the view down and release its export artifact. Pending work
    /// resumes as a no-op.
    pub async fn destroy(&self) {
        let previous = {
            let mut state = self.state.lock();
            self.liveness.destroy();
            std::mem::replace(&mut *state, ViewState::Destroyed)
        };
        tracing::debug!(element = %self.image_element, "Watermark view destroyed");

        if let ViewState::Rendered(surface) = previous {
            self.host.exports.forget(surface.id()).await;
        }
    }

    async fn render(&self) -> Result<RenderOutcome, WatermarkError> {
        if !self.set_state_if_alive(ViewState::Loading) {
            return Ok(RenderOutcome::Abandoned);
        }

        let result = self.run_pipeline().await;

        if !self.liveness.is_alive() {
            tracing::debug!(element = %self.image_element, "Render resumed after teardown, discarding");
            return Ok(RenderOutcome::Abandoned);
        }

        match result {
            Ok(Some(surface)) => {
                if !self.set_state_if_alive(ViewState::Rendered(Arc::clone(&surface))) {
                    return Ok(RenderOutcome::Abandoned);
                }
                tracing::info!(
                    element = %self.image_element,
                    surface_id = %surface.id(),
                    tiles = surface.tile_count(),
                    "Watermark rendered"
                );
                Ok(RenderOutcome::Rendered(surface))
            }
            Ok(None) => Ok(RenderOutcome::Abandoned),
            Err(e) => {
                tracing::warn!(element = %self.image_element, error = %e, "Watermark render failed");
                self.set_state_if_alive(ViewState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    /// Resolve, size and composite. `None` when torn down mid-flight.
    async fn run_pipeline(&self) -> Result<Option<Arc<CompositedSurface>>, WatermarkError> {
        let metadata: ImageMetadata = self.host.resolver.resolve(&self.options.image_url).await?;
        if !self.liveness.is_alive() {
            return Ok(None);
        }
        tracing::debug!(
            url = %self.options.image_url,
            width = metadata.intrinsic_width,
            height = metadata.intrinsic_height,
            "Image metadata resolved"
        );

        let width = self.host.layout.element_width(&self.image_element).await;
        if !self.liveness.is_alive() {
            return Ok(None);
        }
        let width = width.ok_or_else(|| {
            LayoutUnresolvedError::new(&self.image_element, "host reported no width")
        })?;

        let dimensions = compute_dimensions(&self.image_element, width, &metadata)?;
        tracing::debug!(
            logical_width = dimensions.logical_width,
            logical_height = dimensions.logical_height,
            multiplier = dimensions.device_pixel_multiplier,
            "Surface dimensions computed"
        );

        let surface = self.host.surfaces.create();
        let composited = composite(&self.config, &metadata, &dimensions, surface)?;

        Ok(Some(Arc::new(composited)))
    }

    fn set_state_if_alive(&self, next: ViewState) -> bool {
        let mut state = self.state.lock();
        if !self.liveness.is_alive() {
            return false;
        }
        *state = next;
        true
    }
}

impl Drop for WatermarkView {
    fn drop(&mut self) {
        self.liveness.destroy();
    }
}
