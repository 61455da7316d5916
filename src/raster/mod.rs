//! Page rasterization
//!
//! A [`PageRasterizer`] opens documents; the resulting [`RasterDocument`]
//! renders one page at a time into an RGB [`RasterImage`]. Nothing is cached:
//! each page is rendered once, on demand, and dropped after it is drawn.

#[cfg(feature = "mupdf")]
mod mupdf_backend;

use std::fmt;
use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

#[cfg(feature = "mupdf")]
pub use mupdf_backend::MupdfRasterizer;

/// Resolution that a scale of 1.0 corresponds to
pub const BASE_DPI: f32 = 72.0;

/// Convert a target resolution into a scale over [`BASE_DPI`]
#[must_use]
pub fn scale_for_dpi(dpi: f32) -> f32 {
    dpi / BASE_DPI
}

/// Errors from rasterization backends
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[cfg(feature = "mupdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("raster backend `{0}` is not compiled in")]
    BackendUnavailable(RasterBackend),

    #[error("{detail}")]
    Generic { detail: String },
}

impl RasterError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Rendered page pixels, 3 bytes per pixel
#[derive(Clone)]
pub struct RasterImage {
    pixels: RgbImage,
}

impl RasterImage {
    /// Wrap an existing buffer; both dimensions must be positive
    pub fn new(pixels: RgbImage) -> Result<Self, RasterError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(RasterError::generic(format!(
                "Empty raster: {}x{}",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    /// Build from tightly packed RGB rows
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        let pixels = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            RasterError::generic(format!("RGB buffer does not match {width}x{height}"))
        })?;
        Self::new(pixels)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    #[must_use]
    pub fn into_pixels(self) -> RgbImage {
        self.pixels
    }

    /// Turn the image a quarter counter-clockwise
    #[must_use]
    pub fn rotated(self) -> Self {
        Self {
            pixels: image::imageops::rotate270(&self.pixels),
        }
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// Opens documents for rendering.
///
/// Implementations are moved onto the job's worker thread, so they must be
/// `Send`. The documents they open stay on that thread.
pub trait PageRasterizer: Send {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterDocument>, RasterError>;
}

/// An open, decoded document owned by a single job
pub trait RasterDocument {
    fn page_count(&self) -> usize;

    /// Render page `page` (0-indexed) at `scale` times 72 dpi
    fn rasterize(&self, page: usize, scale: f32) -> Result<RasterImage, RasterError>;

    /// Release decoder state. Called exactly once, as the document is dropped.
    fn close(&mut self);
}

/// Decoder selected at configuration time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterBackend {
    #[default]
    Mupdf,
}

impl RasterBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            RasterBackend::Mupdf => "mupdf",
        }
    }

    /// Instantiate the backend
    pub fn rasterizer(self) -> Result<Box<dyn PageRasterizer>, RasterError> {
        match self {
            #[cfg(feature = "mupdf")]
            RasterBackend::Mupdf => Ok(Box::new(MupdfRasterizer::new())),
            #[cfg(not(feature = "mupdf"))]
            RasterBackend::Mupdf => Err(RasterError::BackendUnavailable(self)),
        }
    }
}

impl fmt::Display for RasterBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
