//! Drawing surface abstraction and the CPU raster implementation.
//!
//! Drawing calls take absolute logical coordinates. Text takes an explicit
//! rotation; there is no transform stack to save or restore.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;

use super::text_renderer::{FontFace, TextMask};
use super::Rgba;

/// A 2D drawing surface.
///
/// Coordinates passed to drawing calls are logical; the surface multiplies
/// them by the scale set with [`DrawSurface::set_scale`].
pub trait DrawSurface: Send {
    /// Allocate a transparent pixel buffer of the given physical size.
    fn allocate(&mut self, physical_width: u32, physical_height: u32);

    /// Uniform logical-to-physical scale for subsequent calls.
    fn set_scale(&mut self, scale: f32);

    /// Draw `image` stretched to the logical rectangle.
    fn draw_image(&mut self, image: &DynamicImage, x: f32, y: f32, width: f32, height: f32);

    fn set_fill_color(&mut self, color: Rgba);

    fn set_font_size(&mut self, font_size: f32);

    /// Advance width of `text` at `font_size` logical pixels.
    fn measure_text(&self, text: &str, font_size: f32) -> f32;

    /// Fill `text` with its baseline origin at `(x, y)`, the baseline turned
    /// by `rotation_radians` (positive turns clockwise on screen).
    fn fill_text(&mut self, text: &str, x: f32, y: f32, rotation_radians: f32);

    /// Hand over the pixel buffer.
    fn into_pixels(self: Box<Self>) -> RgbaImage;
}

/// Creates fresh drawing surfaces.
pub trait SurfaceProvider: Send + Sync {
    fn create(&self) -> Box<dyn DrawSurface>;
}

struct CachedMask {
    text: String,
    size_bits: u32,
    mask: Arc<TextMask>,
}

/// CPU surface backed by an [`RgbaImage`].
pub struct RasterSurface {
    font: Arc<FontFace>,
    buffer: RgbaImage,
    scale: f32,
    fill: Rgba,
    font_size: f32,
    last_mask: Option<CachedMask>,
}

impl RasterSurface {
    pub fn new(font: Arc<FontFace>) -> Self {
        Self {
            font,
            buffer: RgbaImage::new(0, 0),
            scale: 1.0,
            fill: Rgba::black(),
            font_size: 10.0,
            last_mask: None,
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.buffer
    }

    fn mask_for(&mut self, text: &str, device_size: f32) -> Arc<TextMask> {
        let size_bits = device_size.to_bits();
        if let Some(cached) = &self.last_mask {
            if cached.size_bits == size_bits && cached.text == text {
                return Arc::clone(&cached.mask);
            }
        }

        let mask = Arc::new(self.font.rasterize(text, device_size));
        self.last_mask = Some(CachedMask {
            text: text.to_string(),
            size_bits,
            mask: Arc::clone(&mask),
        });
        mask
    }
}

impl DrawSurface for RasterSurface {
    fn allocate(&mut self, physical_width: u32, physical_height: u32) {
        self.buffer = RgbaImage::new(physical_width, physical_height);
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn draw_image(&mut self, image: &DynamicImage, x: f32, y: f32, width: f32, height: f32) {
        let target_w = (width * self.scale).round();
        let target_h = (height * self.scale).round();
        if target_w < 1.0 || target_h < 1.0 {
            return;
        }

        let resized = imageops::resize(
            &image.to_rgba8(),
            target_w as u32,
            target_h as u32,
            FilterType::Triangle,
        );
        imageops::overlay(
            &mut self.buffer,
            &resized,
            (x * self.scale).round() as i64,
            (y * self.scale).round() as i64,
        );
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.fill = color;
    }

    fn set_font_size(&mut self, font_size: f32) {
        self.font_size = font_size;
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        self.font.measure(text, font_size)
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, rotation_radians: f32) {
        if text.is_empty() || self.fill.a == 0 || self.buffer.width() == 0 {
            return;
        }

        let mask = self.mask_for(text, self.font_size * self.scale);
        let ox = x * self.scale;
        let oy = y * self.scale;
        let (sin, cos) = rotation_radians.sin_cos();

        // Device-space bounding box of the rotated mask
        let (min_u, min_v, max_u, max_v) = mask.extent();
        let corners = [(min_u, min_v), (max_u, min_v), (min_u, max_v), (max_u, max_v)];
        let xs = corners.map(|(u, v)| ox + u * cos - v * sin);
        let ys = corners.map(|(u, v)| oy + u * sin + v * cos);

        let clamp_x = |v: f32| v.clamp(0.0, self.buffer.width() as f32) as u32;
        let clamp_y = |v: f32| v.clamp(0.0, self.buffer.height() as f32) as u32;
        let x0 = clamp_x(xs.iter().copied().fold(f32::INFINITY, f32::min).floor());
        let x1 = clamp_x(xs.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil());
        let y0 = clamp_y(ys.iter().copied().fold(f32::INFINITY, f32::min).floor());
        let y1 = clamp_y(ys.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil());

        let alpha = self.fill.alpha();
        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - ox;
                let dy = py as f32 + 0.5 - oy;
                let u = dx * cos + dy * sin;
                let v = -dx * sin + dy * cos;

                let coverage = mask.sample(u, v);
                if coverage <= 0.0 {
                    continue;
                }

                let pixel = self.buffer.get_pixel_mut(px, py);
                *pixel = blend_over(*pixel, self.fill, coverage * alpha);
            }
        }
    }

    fn into_pixels(self: Box<Self>) -> RgbaImage {
        self.buffer
    }
}

/// Provides [`RasterSurface`]s sharing one font.
#[derive(Debug, Clone)]
pub struct RasterSurfaceProvider {
    font: Arc<FontFace>,
}

impl RasterSurfaceProvider {
    pub fn new(font: FontFace) -> Self {
        Self {
            font: Arc::new(font),
        }
    }

    pub fn font(&self) -> &FontFace {
        &self.font
    }
}

impl SurfaceProvider for RasterSurfaceProvider {
    fn create(&self) -> Box<dyn DrawSurface> {
        Box::new(RasterSurface::new(Arc::clone(&self.font)))
    }
}

/// Porter-Duff "over": paint `color` at `alpha` onto `bottom`.
pub fn blend_over(bottom: image::Rgba<u8>, color: Rgba, alpha: f32) -> image::Rgba<u8> {
    let top_alpha = alpha.clamp(0.0, 1.0);
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);
    if out_alpha < 0.001 {
        return image::Rgba([0, 0, 0, 0]);
    }

    let blend = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let result = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    image::Rgba([
        blend(color.r, bottom[0]),
        blend(color.g, bottom[1]),
        blend(color.b, bottom[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
