//! Hand finished sheets to the system spooler

use std::process::{Command, Stdio};

use log::{error, info};

use super::{Confirmation, DeviceError, PrintDevice, SheetDevice};
use crate::fit::DrawableRect;
use crate::raster::RasterImage;

/// Default spooler on CUPS systems
pub const DEFAULT_SPOOL_COMMAND: &str = "lp";

/// Renders sheets through a [`SheetDevice`], then submits them in one
/// spooler invocation: `<program> <args...> <sheet files...>`
pub struct SpoolDevice {
    sheets: SheetDevice,
    program: String,
    args: Vec<String>,
}

impl SpoolDevice {
    /// `command` is split on whitespace into program and leading arguments
    pub fn new(sheets: SheetDevice, command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .unwrap_or_else(|| DEFAULT_SPOOL_COMMAND.to_string());
        Self {
            sheets,
            program,
            args: parts.collect(),
        }
    }

    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn submit(&self) -> Result<(), DeviceError> {
        let sheets = self.sheets.sheets();
        info!(
            "Spooling {} sheet(s) with `{}`",
            sheets.len(),
            self.command_line()
        );

        let status = Command::new(&self.program)
            .args(&self.args)
            .args(sheets)
            .stdin(Stdio::null())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            error!("Spooler `{}` exited with {status}", self.command_line());
            Err(DeviceError::Spool {
                command: self.command_line(),
                status: status.to_string(),
            })
        }
    }
}

impl PrintDevice for SpoolDevice {
    fn confirm(&mut self) -> Result<Confirmation, DeviceError> {
        self.sheets.confirm()
    }

    fn drawable_rect(&self) -> DrawableRect {
        self.sheets.drawable_rect()
    }

    fn begin(&mut self) -> Result<(), DeviceError> {
        self.sheets.begin()
    }

    fn new_sheet(&mut self) -> Result<(), DeviceError> {
        self.sheets.new_sheet()
    }

    fn draw_image(
        &mut self,
        target: DrawableRect,
        image: &RasterImage,
    ) -> Result<(), DeviceError> {
        self.sheets.draw_image(target, image)
    }

    fn finish(&mut self) -> Result<(), DeviceError> {
        self.sheets.finish()?;
        self.submit()
    }

    fn abort(&mut self, reason: &str) {
        self.sheets.abort(reason);
    }

    fn close(&mut self) {
        self.sheets.close();
    }
}
