//! MuPDF rasterizer

use std::path::Path;

use log::debug;
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::{PageRasterizer, RasterDocument, RasterError, RasterImage};

/// Renders pages with MuPDF into device RGB
#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfRasterizer;

impl MupdfRasterizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PageRasterizer for MupdfRasterizer {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterDocument>, RasterError> {
        let doc = Document::open(path.to_string_lossy().as_ref())?;
        let page_count = usize::try_from(doc.page_count()?).unwrap_or(0);
        debug!("Opened {path:?} with MuPDF: {page_count} pages");

        Ok(Box::new(MupdfDocument { doc, page_count }))
    }
}

struct MupdfDocument {
    doc: Document,
    page_count: usize,
}

impl RasterDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn rasterize(&self, page_num: usize, scale: f32) -> Result<RasterImage, RasterError> {
        if page_num >= self.page_count {
            return Err(RasterError::PageOutOfRange {
                page: page_num,
                page_count: self.page_count,
            });
        }

        let page = self.doc.load_page(page_num as i32)?;
        let transform = Matrix::new_scale(scale, scale);
        let rgb = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&transform, &rgb, false, false)?;

        let pixels = pixmap_to_rgb(&pixmap)?;
        RasterImage::from_raw(pixmap.width(), pixmap.height(), pixels)
    }

    fn close(&mut self) {
        debug!("Closing MuPDF document ({} pages)", self.page_count);
    }
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, RasterError> {
    pack_rgb(
        pixmap.samples(),
        pixmap.width() as usize,
        pixmap.height() as usize,
        pixmap.stride() as usize,
        pixmap.n() as usize,
    )
}

/// Tight RGB rows from `height` rows of `stride` bytes holding `channels`
/// bytes per pixel. Row padding and channels past the third are dropped.
fn pack_rgb(
    samples: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
) -> Result<Vec<u8>, RasterError> {
    if channels < 3 {
        return Err(RasterError::generic(format!(
            "pixmap has {channels} channel(s), need RGB"
        )));
    }
    let row_len = width * channels;
    if row_len > stride || samples.len() < stride.saturating_mul(height) {
        return Err(RasterError::generic(format!(
            "pixmap buffer of {} bytes does not hold {height} rows of {stride}",
            samples.len()
        )));
    }

    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in samples.chunks(stride).take(height) {
        for px in row[..row_len].chunks_exact(channels) {
            rgb.extend_from_slice(&px[..3]);
        }
    }
    Ok(rgb)
}
