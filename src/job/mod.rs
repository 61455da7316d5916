//! Print jobs: descriptors, page ranges, outcomes and the runner

mod progress;
mod runner;

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub use progress::{
    DEFAULT_CHANNEL_CAPACITY, JobEvent, Percent, ProgressReceiver, ProgressSender, channel,
};
pub use runner::{PrintJobHandle, PrintJobRunner};

use crate::device::{DeviceError, PageSelection};
use crate::fit::FitMode;
use crate::raster::{RasterError, scale_for_dpi};

/// Immutable input to one job
#[derive(Clone, Debug, PartialEq)]
pub struct JobDescriptor {
    pub document_path: PathBuf,
    /// Multiplier over 72 dpi
    pub resolution_scale: f32,
    pub fit_mode: FitMode,
}

impl JobDescriptor {
    #[must_use]
    pub fn new(document_path: impl Into<PathBuf>, resolution_scale: f32) -> Self {
        Self {
            document_path: document_path.into(),
            resolution_scale,
            fit_mode: FitMode::default(),
        }
    }

    /// Render at `dpi` dots per inch
    #[must_use]
    pub fn at_dpi(document_path: impl Into<PathBuf>, dpi: f32) -> Self {
        Self::new(document_path, scale_for_dpi(dpi))
    }

    #[must_use]
    pub fn with_fit_mode(mut self, fit_mode: FitMode) -> Self {
        self.fit_mode = fit_mode;
        self
    }

    /// Checks done before a job is started
    pub fn validate(&self) -> Result<(), PrintError> {
        let invalid = |reason: &str| PrintError::InvalidInput {
            path: self.document_path.clone(),
            reason: reason.to_string(),
        };

        if self.document_path.as_os_str().is_empty() {
            return Err(invalid("no document selected"));
        }
        if !self.document_path.is_file() {
            return Err(invalid("not an existing file"));
        }
        if !self.resolution_scale.is_finite() || self.resolution_scale <= 0.0 {
            return Err(invalid("resolution scale must be positive"));
        }
        Ok(())
    }
}

/// Zero-based, inclusive range of pages to print.
///
/// Only built by [`PageRange::resolve`], so it always holds at least one page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRange {
    first: usize,
    last: usize,
}

impl PageRange {
    /// Translate the device's selection for a document of `page_count` pages
    pub fn resolve(selection: PageSelection, page_count: usize) -> Result<Self, PrintError> {
        let (from, to) = match selection {
            PageSelection::All => {
                if page_count == 0 {
                    return Err(PrintError::InvalidPageRange {
                        from: 1,
                        to: 0,
                        page_count,
                    });
                }
                return Ok(Self {
                    first: 0,
                    last: page_count - 1,
                });
            }
            PageSelection::Range { from, to } => (from, to),
        };

        let in_bounds = from >= 1 && from <= to && (to as usize) <= page_count;
        if !in_bounds {
            return Err(PrintError::InvalidPageRange {
                from,
                to,
                page_count,
            });
        }

        Ok(Self {
            first: from as usize - 1,
            last: to as usize - 1,
        })
    }

    #[must_use]
    pub fn first(&self) -> usize {
        self.first
    }

    #[must_use]
    pub fn last(&self) -> usize {
        self.last
    }

    /// Number of pages in the range, never zero
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.last - self.first + 1
    }

    #[must_use]
    pub fn iter(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Errors that end a job
#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("cannot print {path:?}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("cannot open {path:?}: {source}")]
    DocumentOpen {
        path: PathBuf,
        #[source]
        source: RasterError,
    },

    #[error("page range {from}-{to} does not fit a document of {page_count} pages")]
    InvalidPageRange {
        from: u32,
        to: u32,
        page_count: usize,
    },

    #[error("page {} failed to render: {source}", .page + 1)]
    PageRender {
        /// 0-indexed
        page: usize,
        #[source]
        source: RasterError,
    },

    #[error("print device: {0}")]
    Device(#[from] DeviceError),

    #[error("failed to start print worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("print worker stopped before reporting an outcome")]
    Interrupted,
}

impl PrintError {
    pub(crate) fn document_open(path: &Path, source: RasterError) -> Self {
        Self::DocumentOpen {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// How a job ended
#[derive(Debug)]
pub enum JobOutcome {
    Completed { pages: usize },
    /// The confirmation step was declined; nothing was printed
    Declined,
    Failed(PrintError),
}

impl JobOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }
}
