//! Print-to-file device: one PNG per sheet

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{Confirmation, DeviceError, PageRangeDialog, PrintDevice};
use crate::fit::DrawableRect;
use crate::raster::RasterImage;

const MM_PER_INCH: f32 = 25.4;
const PAPER_WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Supported paper sizes, portrait
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Paper {
    #[default]
    A4,
    A3,
    Letter,
    Legal,
}

impl Paper {
    /// Width and height in millimetres
    #[must_use]
    pub const fn size_mm(self) -> (f32, f32) {
        match self {
            Paper::A4 => (210.0, 297.0),
            Paper::A3 => (297.0, 420.0),
            Paper::Letter => (215.9, 279.4),
            Paper::Legal => (215.9, 355.6),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Paper::A4 => "a4",
            Paper::A3 => "a3",
            Paper::Letter => "letter",
            Paper::Legal => "legal",
        }
    }
}

/// Sheet geometry in device pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SheetLayout {
    pub paper: Paper,
    /// Device resolution, pixels per inch
    pub dpi: u32,
    /// Unprintable border on every edge
    pub margin_mm: f32,
}

impl SheetLayout {
    #[must_use]
    pub const fn new(paper: Paper, dpi: u32, margin_mm: f32) -> Self {
        Self {
            paper,
            dpi,
            margin_mm,
        }
    }

    fn mm_to_px(&self, mm: f32) -> u32 {
        (mm / MM_PER_INCH * self.dpi as f32).round().max(0.0) as u32
    }

    /// Full sheet size in pixels
    #[must_use]
    pub fn sheet_size(&self) -> (u32, u32) {
        let (width_mm, height_mm) = self.paper.size_mm();
        (self.mm_to_px(width_mm), self.mm_to_px(height_mm))
    }

    /// Sheet minus margins
    #[must_use]
    pub fn drawable_rect(&self) -> DrawableRect {
        let (width, height) = self.sheet_size();
        let margin = self.mm_to_px(self.margin_mm);
        DrawableRect::new(
            margin,
            margin,
            width.saturating_sub(margin.saturating_mul(2)),
            height.saturating_sub(margin.saturating_mul(2)),
        )
    }
}

/// Composes each sheet in memory and writes it as `<name>-NNN.png`
pub struct SheetDevice {
    dialog: Box<dyn PageRangeDialog>,
    layout: SheetLayout,
    output_dir: PathBuf,
    job_name: String,
    canvas: Option<RgbImage>,
    written: Vec<PathBuf>,
}

impl SheetDevice {
    pub fn new(
        dialog: Box<dyn PageRangeDialog>,
        layout: SheetLayout,
        output_dir: impl Into<PathBuf>,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            dialog,
            layout,
            output_dir: output_dir.into(),
            job_name: job_name.into(),
            canvas: None,
            written: Vec::new(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> SheetLayout {
        self.layout
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Sheets written so far, in order
    #[must_use]
    pub fn sheets(&self) -> &[PathBuf] {
        &self.written
    }

    fn blank_sheet(&self) -> RgbImage {
        let (width, height) = self.layout.sheet_size();
        RgbImage::from_pixel(width, height, PAPER_WHITE)
    }

    fn flush_sheet(&mut self) -> Result<(), DeviceError> {
        let canvas = self.canvas.take().ok_or(DeviceError::NoSurface)?;
        let path = self
            .output_dir
            .join(format!("{}-{:03}.png", self.job_name, self.written.len() + 1));
        canvas.save(&path)?;
        debug!("Wrote sheet {path:?}");
        self.written.push(path);
        Ok(())
    }
}

impl PrintDevice for SheetDevice {
    fn confirm(&mut self) -> Result<Confirmation, DeviceError> {
        let target = self.output_dir.display().to_string();
        self.dialog.exec(&target)
    }

    fn drawable_rect(&self) -> DrawableRect {
        self.layout.drawable_rect()
    }

    fn begin(&mut self) -> Result<(), DeviceError> {
        let drawable = self.drawable_rect();
        if drawable.is_empty() {
            return Err(DeviceError::EmptyArea(drawable));
        }
        fs::create_dir_all(&self.output_dir)?;
        self.written.clear();
        self.canvas = Some(self.blank_sheet());
        Ok(())
    }

    fn new_sheet(&mut self) -> Result<(), DeviceError> {
        self.flush_sheet()?;
        self.canvas = Some(self.blank_sheet());
        Ok(())
    }

    fn draw_image(
        &mut self,
        target: DrawableRect,
        image: &RasterImage,
    ) -> Result<(), DeviceError> {
        let drawable = self.drawable_rect();
        if !drawable.contains_relative(&target) {
            return Err(DeviceError::OutOfBounds { target, drawable });
        }
        let canvas = self.canvas.as_mut().ok_or(DeviceError::NoSurface)?;
        if target.is_empty() {
            return Err(DeviceError::EmptyArea(target));
        }

        let scaled = imageops::resize(
            image.pixels(),
            target.width,
            target.height,
            FilterType::Triangle,
        );
        imageops::overlay(
            canvas,
            &scaled,
            i64::from(drawable.x) + i64::from(target.x),
            i64::from(drawable.y) + i64::from(target.y),
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DeviceError> {
        self.flush_sheet()?;
        info!(
            "Finished {} sheet(s) in {:?}",
            self.written.len(),
            self.output_dir
        );
        Ok(())
    }

    fn abort(&mut self, reason: &str) {
        self.canvas = None;
        warn!(
            "Discarding {} sheet(s) in {:?}: {reason}",
            self.written.len(),
            self.output_dir
        );
        for path in self.written.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove partial sheet {path:?}: {e}");
            }
        }
    }

    fn close(&mut self) {
        self.canvas = None;
        debug!("Closed sheet device on {:?}", self.output_dir);
    }
}
