//! Background image resolution with caching.
//!
//! Resolves a source URL to its intrinsic pixel dimensions together with the
//! decoded pixels the compositor draws from.
//!
//! # Supported Sources
//!
//! - `https://example.com/image.png` / `http://...` - fetched over HTTP
//! - `file:///path/to/image.png` - read from the local filesystem
//! - `/path/to/image.png` or `relative/image.png` - bare filesystem path
//!
//! # Caching
//!
//! Decoded images are cached in memory per source URL. The cache uses LRU
//! eviction with a configurable TTL. Failures are never cached.
//!
//! # Example
//!
//! ```ignore
//! use filigrane::watermark::image_fetcher::{ImageFetcherConfig, SourceImageResolver};
//! use filigrane::watermark::ImageMetadataResolver;
//!
//! let resolver = SourceImageResolver::new(ImageFetcherConfig::default())?;
//! let metadata = resolver.resolve("https://cdn.example.com/poster.png").await?;
//! println!("{}x{}", metadata.intrinsic_width, metadata.intrinsic_height);
//! ```

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, ImageFormat};
use moka::future::Cache;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::ImageFetchError;

/// Configuration for the image resolver.
#[derive(Debug, Clone)]
pub struct ImageFetcherConfig {
    /// Maximum number of cached images.
    pub max_cache_entries: u64,
    /// Time-to-live for cached images.
    pub cache_ttl: Duration,
    /// Timeout applied to each HTTP request.
    pub request_timeout: Duration,
}

impl Default for ImageFetcherConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 100,
            cache_ttl: Duration::from_secs(3600), // 1 hour
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Intrinsic dimensions and decoded pixels of a background image.
#[derive(Clone)]
pub struct ImageMetadata {
    pub intrinsic_width: u32,
    pub intrinsic_height: u32,
    /// Decoded pixels, shared with the cache and never mutated.
    pub decoded: Arc<DynamicImage>,
}

impl ImageMetadata {
    /// Build metadata from an already decoded image.
    pub fn from_image(image: DynamicImage) -> Self {
        let (intrinsic_width, intrinsic_height) = image.dimensions();
        Self {
            intrinsic_width,
            intrinsic_height,
            decoded: Arc::new(image),
        }
    }
}

impl std::fmt::Debug for ImageMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageMetadata")
            .field("intrinsic_width", &self.intrinsic_width)
            .field("intrinsic_height", &self.intrinsic_height)
            .finish()
    }
}

/// Resolves a source URL to image metadata.
///
/// A single call either succeeds or fails; callers do not retry.
#[async_trait]
pub trait ImageMetadataResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ImageMetadata, ImageFetchError>;
}

/// Parsed source location for background images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// HTTP or HTTPS URL.
    Http(String),
    /// Local file.
    File(PathBuf),
}

impl ImageSource {
    /// Parse a source string into an ImageSource.
    ///
    /// # Errors
    ///
    /// Returns error for empty sources and unsupported schemes such as `ftp://`.
    pub fn parse(source: &str) -> Result<Self, ImageFetchError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(ImageFetchError::new(source, "Image source is empty"));
        }

        if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            return Ok(ImageSource::Http(trimmed.to_string()));
        }

        if let Some(path) = trimmed.strip_prefix("file://") {
            if path.is_empty() {
                return Err(ImageFetchError::new(source, "file:// source has no path"));
            }
            return Ok(ImageSource::File(PathBuf::from(path)));
        }

        if trimmed.contains("://") {
            return Err(ImageFetchError::new(
                source,
                "Unsupported source protocol. Use https://, http://, file:// or a path",
            ));
        }

        Ok(ImageSource::File(PathBuf::from(trimmed)))
    }

    /// Get a cache key for this source.
    pub fn cache_key(&self) -> String {
        match self {
            ImageSource::Http(url) => url.clone(),
            ImageSource::File(path) => format!("file://{}", path.display()),
        }
    }
}

/// Default resolver: HTTP via reqwest, files via tokio, decoding via `image`.
#[derive(Clone)]
pub struct SourceImageResolver {
    cache: Cache<String, ImageMetadata>,
    http_client: reqwest::Client,
}

impl SourceImageResolver {
    /// Create a new resolver with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `ImageFetchError` if the HTTP client cannot be created
    /// (e.g., TLS configuration issues).
    pub fn new(config: ImageFetcherConfig) -> Result<Self, ImageFetchError> {
        let cache = Cache::builder()
            .max_capacity(config.max_cache_entries)
            .time_to_live(config.cache_ttl)
            .build();

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ImageFetchError::new("", format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { cache, http_client })
    }

    async fn fetch_bytes(&self, url: &str, source: &ImageSource) -> Result<Vec<u8>, ImageFetchError> {
        match source {
            ImageSource::Http(target) => {
                let response = self
                    .http_client
                    .get(target)
                    .send()
                    .await
                    .map_err(|e| ImageFetchError::new(url, format!("HTTP fetch failed: {e}")))?;

                if !response.status().is_success() {
                    return Err(ImageFetchError::new(
                        url,
                        format!("HTTP request failed with status: {}", response.status()),
                    ));
                }

                let bytes = response.bytes().await.map_err(|e| {
                    ImageFetchError::new(url, format!("Failed to read HTTP body: {e}"))
                })?;
                Ok(bytes.to_vec())
            }
            ImageSource::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| ImageFetchError::new(url, format!("Failed to read file: {e}"))),
        }
    }

    /// Get the number of cached images.
    pub fn cache_size(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Clear all cached images.
    pub async fn clear_cache(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Check if a source is cached.
    pub async fn is_cached(&self, source: &str) -> bool {
        if let Ok(parsed) = ImageSource::parse(source) {
            self.cache.get(&parsed.cache_key()).await.is_some()
        } else {
            false
        }
    }
}

#[async_trait]
impl ImageMetadataResolver for SourceImageResolver {
    async fn resolve(&self, url: &str) -> Result<ImageMetadata, ImageFetchError> {
        let parsed = ImageSource::parse(url)?;
        let cache_key = parsed.cache_key();

        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!(url = %url, "Background image served from cache");
            return Ok(cached);
        }

        let data = self.fetch_bytes(url, &parsed).await?;

        let owned_url = url.to_string();
        let metadata = tokio::task::spawn_blocking(move || decode_image(&data, &owned_url))
            .await
            .map_err(|e| ImageFetchError::new(url, format!("Decode task failed: {e}")))??;

        tracing::debug!(
            url = %url,
            width = metadata.intrinsic_width,
            height = metadata.intrinsic_height,
            "Background image decoded"
        );

        self.cache.insert(cache_key, metadata.clone()).await;
        Ok(metadata)
    }
}

/// Decode raw bytes into metadata, rejecting zero-sized images.
pub fn decode_image(data: &[u8], url: &str) -> Result<ImageMetadata, ImageFetchError> {
    let format = detect_image_format(data, url)?;

    let image = image::load(Cursor::new(data), format)
        .map_err(|e| ImageFetchError::new(url, format!("Failed to decode image: {e}")))?;

    let metadata = ImageMetadata::from_image(image);
    if metadata.intrinsic_width == 0 || metadata.intrinsic_height == 0 {
        return Err(ImageFetchError::new(url, "Decoded image has zero size"));
    }
    Ok(metadata)
}

/// Detect image format from bytes or filename extension.
fn detect_image_format(data: &[u8], path: &str) -> Result<ImageFormat, ImageFetchError> {
    // Magic bytes first
    if let Ok(format) = image::guess_format(data) {
        return Ok(format);
    }

    let without_query = path.split(['?', '#']).next().unwrap_or(path);
    let ext = without_query
        .rsplit('.')
        .next()
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "gif" => Ok(ImageFormat::Gif),
        "webp" => Ok(ImageFormat::WebP),
        _ => Err(ImageFetchError::new(
            path,
            format!("Unsupported image format: {ext}"),
        )),
    }
}
