//! Base bitmap rasterization.
//!
//! The PDF engine itself lives behind [`Rasterizer`]. This module owns the
//! pixel surface the engine draws into and the composition of one or two
//! pages into a frame. A frame is always drawn into a freshly allocated
//! [`Bitmap`]; the caller swaps it in only once every page rendered, so a
//! failure leaves the previous frame untouched.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use tracing::debug;

use crate::error::{DocumentLoadError, RenderError};
use crate::geom::Size;
use crate::viewport::{DocumentHandle, RenderRequest};

/// What the rasterizer reports about a freshly opened document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: u32,
}

/// The external PDF engine.
#[async_trait::async_trait(?Send)]
pub trait Rasterizer {
    /// Parse `bytes` as a PDF and keep it open for later calls.
    async fn open(&self, bytes: &[u8]) -> Result<DocumentInfo, DocumentLoadError>;

    /// Size of a 1-based page at `scale`, in CSS pixels.
    async fn page_size(&self, page: u32, scale: f64) -> Result<Size, RenderError>;

    /// Draw a page at `scale` into `target`, which is already sized for it at
    /// `target.dpr()` density.
    async fn render(&self, page: u32, scale: f64, target: &mut Bitmap) -> Result<(), RenderError>;
}

/// An RGBA pixel buffer with a device pixel ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    dpr: f64,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// A cleared (fully transparent) bitmap.
    #[must_use]
    pub fn new(width: u32, height: u32, dpr: f64) -> Self {
        let len = width as usize * height as usize * 4;
        Self { width, height, dpr, pixels: vec![0; len] }
    }

    /// A cleared bitmap covering `css` pixels at `dpr` density.
    #[must_use]
    pub fn for_css_size(css: Size, dpr: f64) -> Self {
        Self::new(device_px(css.width * dpr), device_px(css.height * dpr), dpr)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    /// Size in CSS pixels.
    #[must_use]
    pub fn css_size(&self) -> Size {
        Size::new(f64::from(self.width) / self.dpr, f64::from(self.height) / self.dpr)
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA at `(x, y)`, or `None` outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Fill every pixel with one colour.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Copy `src` onto this bitmap with its top-left corner at `(x, y)`,
    /// clipping whatever falls outside.
    pub fn blit(&mut self, src: &Bitmap, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let cols = src.width.min(self.width - x) as usize;
        let rows = src.height.min(self.height - y) as usize;
        let dst_stride = self.width as usize * 4;
        let src_stride = src.width as usize * 4;
        for row in 0..rows {
            let d = (y as usize + row) * dst_stride + x as usize * 4;
            let s = row * src_stride;
            self.pixels[d..d + cols * 4].copy_from_slice(&src.pixels[s..s + cols * 4]);
        }
    }
}

/// Round a device-pixel length up to a whole pixel count.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn device_px(v: f64) -> u32 {
    if !v.is_finite() || v <= 0.0 {
        return 0;
    }
    v.ceil().min(f64::from(u32::MAX)) as u32
}

/// Rasterize every page of `request` side by side into a fresh frame.
///
/// # Errors
///
/// Returns the first [`RenderError`] from the rasterizer, or
/// [`RenderError::Page`] if a requested page is outside the document. No
/// partial frame is returned.
pub async fn rasterize_frame<R>(rasterizer: &R, doc: &DocumentHandle, request: &RenderRequest) -> Result<Bitmap, RenderError>
where
    R: Rasterizer + ?Sized,
{
    let mut frame = Bitmap::for_css_size(request.frame, request.dpr);
    let mut x_css = 0.0;
    for &page in &request.pages {
        let size = doc
            .page_size(page)
            .ok_or_else(|| RenderError::Page { page, reason: "page out of range".into() })?
            .scaled(request.scale);
        let mut target = Bitmap::for_css_size(size, request.dpr);
        rasterizer.render(page, request.scale, &mut target).await?;
        frame.blit(&target, device_px(x_css * request.dpr), 0);
        x_css += size.width + request.gap;
    }
    debug!(ticket = request.ticket, pages = ?request.pages, width = frame.width(), height = frame.height(), "raster: frame composed");
    Ok(frame)
}

/// Collect unscaled page sizes for a freshly opened document.
///
/// # Errors
///
/// Returns [`DocumentLoadError::Empty`] for a zero-page document and
/// [`DocumentLoadError::InvalidPdf`] if a page cannot be measured.
pub async fn measure_document<R>(rasterizer: &R, info: DocumentInfo) -> Result<DocumentHandle, DocumentLoadError>
where
    R: Rasterizer + ?Sized,
{
    let mut sizes = Vec::with_capacity(info.page_count as usize);
    for page in 1..=info.page_count {
        let size = rasterizer
            .page_size(page, 1.0)
            .await
            .map_err(|e| DocumentLoadError::InvalidPdf(e.to_string()))?;
        sizes.push(size);
    }
    DocumentHandle::new(sizes)
}
