//! Memoised export of composited surfaces.
//!
//! The first [`ExportCache::export_once`] call for a surface runs the
//! exporter; later calls return the stored artifact. Concurrent calls for the
//! same surface share one conversion. Failed exports are not stored, so the
//! next call tries again.
//!
//! Artifacts live in a bounded moka cache. A view releases its artifact with
//! [`ExportCache::forget`] when it is destroyed; past the capacity older
//! artifacts are evicted.

use async_trait::async_trait;
use image::ImageFormat;
use moka::future::Cache;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::compositor::{CompositedSurface, SurfaceId};
use super::ExportError;

/// Default number of artifacts an [`ExportCache`] keeps.
pub const DEFAULT_MAX_ARTIFACTS: u64 = 1024;

/// A shareable reference to an exported surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Path or other handle the viewer understands.
    pub handle: String,
    pub source_surface: SurfaceId,
}

/// Converts a composited surface into a file or other handle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SurfaceExporter: Send + Sync {
    async fn export(&self, surface: &CompositedSurface) -> Result<String, ExportError>;
}

/// Writes `<surface-id>.png` into a directory.
#[derive(Debug, Clone)]
pub struct PngFileExporter {
    dir: PathBuf,
}

impl PngFileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SurfaceExporter for PngFileExporter {
    async fn export(&self, surface: &CompositedSurface) -> Result<String, ExportError> {
        let id = surface.id();
        let conversion = |reason: String| ExportError::Conversion {
            surface: id,
            reason,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| conversion(format!("Failed to create {}: {}", self.dir.display(), e)))?;

        let path = self.dir.join(format!("{}.png", id));
        let pixels = surface.pixels().clone();
        let target = path.clone();

        tokio::task::spawn_blocking(move || pixels.save_with_format(&target, ImageFormat::Png))
            .await
            .map_err(|e| conversion(format!("Encode task failed: {}", e)))?
            .map_err(|e| conversion(format!("Failed to write {}: {}", path.display(), e)))?;

        Ok(path.to_string_lossy().into_owned())
    }
}

/// Per-surface memo of export artifacts.
pub struct ExportCache {
    exporter: Arc<dyn SurfaceExporter>,
    artifacts: Cache<SurfaceId, ExportArtifact>,
}

impl ExportCache {
    pub fn new(exporter: Arc<dyn SurfaceExporter>) -> Self {
        Self::with_capacity(exporter, DEFAULT_MAX_ARTIFACTS)
    }

    /// Keep at most `max_artifacts` artifacts.
    pub fn with_capacity(exporter: Arc<dyn SurfaceExporter>, max_artifacts: u64) -> Self {
        let artifacts = Cache::builder().max_capacity(max_artifacts).build();
        Self {
            exporter,
            artifacts,
        }
    }

    /// Export `surface`, or return the artifact from an earlier export.
    pub async fn export_once(
        &self,
        surface: &CompositedSurface,
    ) -> Result<ExportArtifact, ExportError> {
        let id = surface.id();
        if let Some(artifact) = self.artifacts.get(&id).await {
            tracing::debug!(surface_id = %id, "Export served from cache");
            return Ok(artifact);
        }

        let conversion = async {
            let handle = self.exporter.export(surface).await.map_err(|e| {
                tracing::warn!(surface_id = %id, error = %e, "Export failed");
                e
            })?;
            tracing::info!(surface_id = %id, handle = %handle, "Surface exported");
            Ok::<_, ExportError>(ExportArtifact {
                handle,
                source_surface: id,
            })
        };

        self.artifacts
            .try_get_with(id, conversion)
            .await
            .map_err(|e| (*e).clone())
    }

    /// Artifact already produced for `id`, if any.
    pub async fn cached(&self, id: SurfaceId) -> Option<ExportArtifact> {
        self.artifacts.get(&id).await
    }

    /// Drop the artifact for `id`. The exported file itself is left alone.
    pub async fn forget(&self, id: SurfaceId) {
        self.artifacts.invalidate(&id).await;
        tracing::debug!(surface_id = %id, "Export artifact released");
    }

    /// Number of stored artifacts once pending evictions have run.
    pub async fn entry_count(&self) -> u64 {
        self.artifacts.run_pending_tasks().await;
        self.artifacts.entry_count()
    }

    pub fn max_artifacts(&self) -> u64 {
        self.artifacts.policy().max_capacity().unwrap_or(u64::MAX)
    }
}
