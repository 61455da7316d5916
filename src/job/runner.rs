//! Print job runner
//!
//! A job runs through: confirm with the device, open the document, resolve
//! the page range, then for every page rasterize, fit, draw and advance to
//! the next sheet (never before the first page, never after the last). The
//! document is closed, the device surface finished or aborted, and the
//! device session closed on every path before the single terminal event is
//! sent.

use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};

use super::progress::{self, DEFAULT_CHANNEL_CAPACITY, JobEvent, Percent, ProgressSender};
use super::{JobDescriptor, JobOutcome, PageRange, PrintError};
use crate::device::{Confirmation, PageSelection, PrintDevice};
use crate::fit;
use crate::raster::{PageRasterizer, RasterDocument};

/// Runs a single job against one rasterizer and one device
pub struct PrintJobRunner {
    rasterizer: Box<dyn PageRasterizer>,
    device: Box<dyn PrintDevice>,
    channel_capacity: usize,
}

impl PrintJobRunner {
    #[must_use]
    pub fn new(rasterizer: Box<dyn PageRasterizer>, device: Box<dyn PrintDevice>) -> Self {
        Self {
            rasterizer,
            device,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Validate `job` and run it on a worker thread.
    ///
    /// Invalid input is returned here and the job never starts. Everything
    /// after that is reported through the returned handle.
    pub fn spawn(self, job: JobDescriptor) -> Result<PrintJobHandle, PrintError> {
        job.validate()?;

        let (events, receiver) = progress::channel(self.channel_capacity);
        let worker = thread::Builder::new()
            .name("pdfspool-job".to_string())
            .spawn(move || self.execute(&job, events))
            .map_err(PrintError::Spawn)?;

        Ok(PrintJobHandle {
            events: receiver,
            worker: Some(worker),
        })
    }

    /// Run `job` on the current thread, reporting to `events`
    pub fn run(self, job: &JobDescriptor, events: ProgressSender) {
        if let Err(err) = job.validate() {
            error!("Rejected print job: {err}");
            events.finish(JobOutcome::Failed(err));
            return;
        }
        self.execute(job, events);
    }

    fn execute(self, job: &JobDescriptor, mut events: ProgressSender) {
        info!(
            "Print job started: {:?} at scale {:.3}, fit {}",
            job.document_path,
            job.resolution_scale,
            job.fit_mode.as_str()
        );

        // Dropped before `events`, so an unwinding job releases the device
        // before the receiver sees `Interrupted`.
        let mut session = DeviceSession::new(self.device);
        let outcome = match print(self.rasterizer.as_ref(), session.device(), job, &mut events) {
            Ok(outcome) => outcome,
            Err(err) => JobOutcome::Failed(err),
        };
        session.close();

        match &outcome {
            JobOutcome::Completed { pages } => info!("Print job completed: {pages} page(s)"),
            JobOutcome::Declined => info!("Print job declined"),
            JobOutcome::Failed(err) => error!("Print job failed: {err}"),
        }
        events.finish(outcome);
    }
}

fn print(
    rasterizer: &dyn PageRasterizer,
    device: &mut dyn PrintDevice,
    job: &JobDescriptor,
    events: &mut ProgressSender,
) -> Result<JobOutcome, PrintError> {
    let selection = match device.confirm()? {
        Confirmation::Accepted(selection) => selection,
        Confirmation::Declined => return Ok(JobOutcome::Declined),
    };
    debug!("Confirmed selection {selection:?}");

    let document = rasterizer
        .open(&job.document_path)
        .map_err(|source| PrintError::document_open(&job.document_path, source))?;
    let document = OpenDocument(document);

    let printed = print_document(document.0.as_ref(), device, selection, job, events);
    drop(document);

    let finished = printed.and_then(|pages| {
        device.finish()?;
        Ok(pages)
    });

    match finished {
        Ok(pages) => Ok(JobOutcome::Completed { pages }),
        Err(err) => {
            device.abort(&err.to_string());
            Err(err)
        }
    }
}

fn print_document(
    document: &dyn RasterDocument,
    device: &mut dyn PrintDevice,
    selection: PageSelection,
    job: &JobDescriptor,
    events: &mut ProgressSender,
) -> Result<usize, PrintError> {
    let range = PageRange::resolve(selection, document.page_count())?;
    let total = range.page_count();
    info!(
        "Printing pages {}-{} of {}",
        range.first() + 1,
        range.last() + 1,
        document.page_count()
    );

    device.begin()?;

    for (position, page) in (1..).zip(range.iter()) {
        if position > 1 {
            device.new_sheet()?;
        }

        let image = document
            .rasterize(page, job.resolution_scale)
            .map_err(|source| PrintError::PageRender { page, source })?;

        let drawable = device.drawable_rect();
        let plan = fit::plan_with_mode(image.width(), image.height(), drawable, job.fit_mode);
        debug!(
            "Page {}: {}x{} raster, rotate={}, target {:?}",
            page + 1,
            image.width(),
            image.height(),
            plan.rotate,
            plan.target
        );

        let image = if plan.rotate { image.rotated() } else { image };
        device.draw_image(plan.target, &image)?;
        drop(image);

        events.progress(Percent::of(position, total));
    }

    Ok(total)
}

/// Closes the document when dropped, including when a page render panics
struct OpenDocument(Box<dyn RasterDocument>);

impl Drop for OpenDocument {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Owns the device for one job.
///
/// [`DeviceSession::close`] is the normal release. If the job unwinds first,
/// dropping the session aborts the surface and closes the device.
struct DeviceSession {
    device: Box<dyn PrintDevice>,
    closed: bool,
}

impl DeviceSession {
    fn new(device: Box<dyn PrintDevice>) -> Self {
        Self {
            device,
            closed: false,
        }
    }

    fn device(&mut self) -> &mut dyn PrintDevice {
        self.device.as_mut()
    }

    fn close(mut self) {
        self.closed = true;
        self.device.close();
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!("Print job unwound, releasing the device");
        self.device.abort("print job interrupted");
        self.device.close();
    }
}

/// Caller's view of a running job
pub struct PrintJobHandle {
    events: progress::ProgressReceiver,
    worker: Option<JoinHandle<()>>,
}

impl PrintJobHandle {
    /// Events that arrived since the last call; never blocks
    pub fn poll(&mut self) -> Vec<JobEvent> {
        let events = self.events.poll();
        if self.events.is_done() {
            self.join();
        }
        events
    }

    /// Block for the next event; `None` after the terminal event
    pub fn next_event(&mut self) -> Option<JobEvent> {
        let event = self.events.recv();
        if self.events.is_done() {
            self.join();
        }
        event
    }

    /// Block until the job ends, discarding progress
    pub fn wait(mut self) -> JobOutcome {
        while let Some(event) = self.next_event() {
            if let JobEvent::Finished(outcome) = event {
                return outcome;
            }
        }
        JobOutcome::Failed(PrintError::Interrupted)
    }

    /// True once the terminal event was delivered
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.events.is_done()
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Print worker panicked");
            }
        }
    }
}

impl Iterator for PrintJobHandle {
    type Item = JobEvent;

    fn next(&mut self) -> Option<JobEvent> {
        self.next_event()
    }
}
