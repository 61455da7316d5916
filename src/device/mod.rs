//! Output device sessions
//!
//! A [`PrintDevice`] is the print service as seen by a job: it asks the user
//! to confirm the job and pick pages, exposes a fixed drawable area, and
//! accepts images sheet by sheet.

mod dialog;
mod sheet;
mod spool;

pub use dialog::{PageRangeDialog, TerminalDialog, parse_answer};
pub use sheet::{Paper, SheetDevice, SheetLayout};
pub use spool::{DEFAULT_SPOOL_COMMAND, SpoolDevice};

use crate::fit::DrawableRect;
use crate::raster::RasterImage;

/// Pages picked in the confirmation step, as the device reports them
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSelection {
    /// No "from" bound: the entire document
    All,
    /// 1-based, inclusive
    Range { from: u32, to: u32 },
}

/// Answer of the interactive confirmation step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Accepted(PageSelection),
    Declined,
}

/// Errors raised by output devices
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding: {0}")]
    Image(#[from] image::ImageError),

    #[error("print dialog: {0}")]
    Dialog(String),

    #[error("spool command `{command}` failed: {status}")]
    Spool { command: String, status: String },

    #[error("target {target:?} lies outside the drawable area {drawable:?}")]
    OutOfBounds {
        target: DrawableRect,
        drawable: DrawableRect,
    },

    #[error("no drawing surface is active")]
    NoSurface,

    #[error("nothing can be drawn into the empty area {0:?}")]
    EmptyArea(DrawableRect),
}

/// One print session, used by exactly one job.
///
/// The job calls, in order: `confirm`; then, if accepted, `begin`, any number
/// of `draw_image` separated by `new_sheet`, and `finish` or `abort`; and
/// finally `close`, which is called on every path including a declined
/// confirmation.
pub trait PrintDevice: Send {
    /// Interactive confirmation and page selection. Runs on the job's thread.
    fn confirm(&mut self) -> Result<Confirmation, DeviceError>;

    /// Area images may be drawn into; fixed for the whole job
    fn drawable_rect(&self) -> DrawableRect;

    /// Acquire the drawing surface for the first sheet
    fn begin(&mut self) -> Result<(), DeviceError>;

    /// Eject the current sheet and start a blank one
    fn new_sheet(&mut self) -> Result<(), DeviceError>;

    /// Draw `image` scaled into `target`, given relative to [`Self::drawable_rect`]
    fn draw_image(&mut self, target: DrawableRect, image: &RasterImage)
    -> Result<(), DeviceError>;

    /// Finalize the drawing surface after the last page
    fn finish(&mut self) -> Result<(), DeviceError>;

    /// Discard the drawing surface. Safe to call when `begin` never ran.
    fn abort(&mut self, reason: &str);

    /// Release the session
    fn close(&mut self);
}
