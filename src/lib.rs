//! Print existing PDF documents as raster sheets without blocking the caller.
//!
//! A [`PrintJobRunner`] takes a [`JobDescriptor`], a [`PageRasterizer`] and a
//! [`PrintDevice`], runs the job on a worker thread, and reports progress and
//! one terminal [`JobOutcome`] through a [`PrintJobHandle`].

pub mod cli;
pub mod device;
pub mod fit;
pub mod job;
pub mod raster;
pub mod settings;

pub use device::{Confirmation, DeviceError, PageSelection, PrintDevice};
pub use fit::{DrawableRect, FitMode, FitPlan};
pub use job::{
    JobDescriptor, JobEvent, JobOutcome, PageRange, Percent, PrintError, PrintJobHandle,
    PrintJobRunner,
};
pub use raster::{PageRasterizer, RasterBackend, RasterDocument, RasterError, RasterImage};
pub use settings::Settings;
