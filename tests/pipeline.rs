use std::path::Path;
use std::sync::{Arc, Mutex};

use image::RgbImage;
use pdfspool::device::{Paper, SheetDevice, SheetLayout, TerminalDialog};
use pdfspool::job::channel;
use pdfspool::{
    Confirmation, DeviceError, DrawableRect, FitMode, JobDescriptor, JobEvent, JobOutcome,
    PageRasterizer, PageSelection, PrintDevice, PrintError, PrintJobRunner, RasterDocument,
    RasterError, RasterImage,
};
use tempfile::NamedTempFile;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Call {
    Confirm,
    Begin,
    NewSheet,
    Draw {
        target: DrawableRect,
        width: u32,
        height: u32,
    },
    Finish,
    Abort,
    Close,
    Rasterize(usize),
    CloseDocument,
}

type Log = Arc<Mutex<Vec<Call>>>;

fn record(log: &Log, call: Call) {
    log.lock().unwrap().push(call);
}

struct ScriptedRasterizer {
    page_count: usize,
    page_size: (u32, u32),
    failing_page: Option<usize>,
    panicking_page: Option<usize>,
    open_fails: bool,
    log: Log,
}

impl PageRasterizer for ScriptedRasterizer {
    fn open(&self, _path: &Path) -> Result<Box<dyn RasterDocument>, RasterError> {
        if self.open_fails {
            return Err(RasterError::generic("not a PDF"));
        }
        Ok(Box::new(ScriptedDocument {
            page_count: self.page_count,
            page_size: self.page_size,
            failing_page: self.failing_page,
            panicking_page: self.panicking_page,
            log: self.log.clone(),
        }))
    }
}

struct ScriptedDocument {
    page_count: usize,
    page_size: (u32, u32),
    failing_page: Option<usize>,
    panicking_page: Option<usize>,
    log: Log,
}

impl RasterDocument for ScriptedDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn rasterize(&self, page: usize, _scale: f32) -> Result<RasterImage, RasterError> {
        record(&self.log, Call::Rasterize(page));
        if Some(page) == self.failing_page {
            return Err(RasterError::generic("corrupt content stream"));
        }
        if Some(page) == self.panicking_page {
            panic!("decoder crashed on page {page}");
        }
        let (width, height) = self.page_size;
        RasterImage::new(RgbImage::new(width, height))
    }

    fn close(&mut self) {
        record(&self.log, Call::CloseDocument);
    }
}

struct RecordingDevice {
    confirmation: Confirmation,
    drawable: DrawableRect,
    failing_draw: Option<usize>,
    draws: usize,
    log: Log,
}

impl PrintDevice for RecordingDevice {
    fn confirm(&mut self) -> Result<Confirmation, DeviceError> {
        record(&self.log, Call::Confirm);
        Ok(self.confirmation)
    }

    fn drawable_rect(&self) -> DrawableRect {
        self.drawable
    }

    fn begin(&mut self) -> Result<(), DeviceError> {
        record(&self.log, Call::Begin);
        Ok(())
    }

    fn new_sheet(&mut self) -> Result<(), DeviceError> {
        record(&self.log, Call::NewSheet);
        Ok(())
    }

    fn draw_image(
        &mut self,
        target: DrawableRect,
        image: &RasterImage,
    ) -> Result<(), DeviceError> {
        self.draws += 1;
        if Some(self.draws) == self.failing_draw {
            return Err(DeviceError::Io(std::io::Error::other("paper jam")));
        }
        record(
            &self.log,
            Call::Draw {
                target,
                width: image.width(),
                height: image.height(),
            },
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DeviceError> {
        record(&self.log, Call::Finish);
        Ok(())
    }

    fn abort(&mut self, _reason: &str) {
        record(&self.log, Call::Abort);
    }

    fn close(&mut self) {
        record(&self.log, Call::Close);
    }
}

struct Fixture {
    document: NamedTempFile,
    log: Log,
    rasterizer: ScriptedRasterizer,
    device: RecordingDevice,
}

impl Fixture {
    fn new(page_count: usize, page_size: (u32, u32), drawable: DrawableRect) -> Self {
        let log = Log::default();
        Self {
            document: NamedTempFile::new().unwrap(),
            rasterizer: ScriptedRasterizer {
                page_count,
                page_size,
                failing_page: None,
                panicking_page: None,
                open_fails: false,
                log: log.clone(),
            },
            device: RecordingDevice {
                confirmation: Confirmation::Accepted(PageSelection::All),
                drawable,
                failing_draw: None,
                draws: 0,
                log: log.clone(),
            },
            log,
        }
    }

    fn job(&self) -> JobDescriptor {
        JobDescriptor::new(self.document.path(), 150.0 / 72.0)
    }

    /// Spawn the job and collect every event until the terminal one
    fn run(self) -> (Vec<JobEvent>, Vec<Call>) {
        self.run_job(|job| job)
    }

    fn run_job(
        self,
        adjust: impl FnOnce(JobDescriptor) -> JobDescriptor,
    ) -> (Vec<JobEvent>, Vec<Call>) {
        let job = adjust(self.job());
        let handle = PrintJobRunner::new(Box::new(self.rasterizer), Box::new(self.device))
            .spawn(job)
            .unwrap();
        let events: Vec<JobEvent> = handle.collect();
        let calls = self.log.lock().unwrap().clone();
        drop(self.document);
        (events, calls)
    }
}

fn progress(events: &[JobEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            JobEvent::Progress(p) => Some(p.value()),
            JobEvent::Finished(_) => None,
        })
        .collect()
}

fn terminal_count(events: &[JobEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, JobEvent::Finished(_)))
        .count()
}

fn count(calls: &[Call], wanted: &Call) -> usize {
    calls.iter().filter(|call| *call == wanted).count()
}

#[test]
fn test_five_landscape_pages_on_landscape_sheet() {
    let fixture = Fixture::new(5, (1200, 900), DrawableRect::sized(800, 600));
    let (events, calls) = fixture.run();

    assert_eq!(progress(&events), vec![20, 40, 60, 80, 100]);
    assert_eq!(count(&calls, &Call::NewSheet), 4);
    let draw = Call::Draw {
        target: DrawableRect::new(0, 0, 800, 600),
        width: 1200,
        height: 900,
    };
    assert_eq!(count(&calls, &draw), 5);
    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(
        events.last(),
        Some(JobEvent::Finished(JobOutcome::Completed { pages: 5 }))
    ));
}

#[test]
fn test_landscape_page_on_portrait_sheet_is_rotated() {
    let fixture = Fixture::new(1, (1200, 900), DrawableRect::sized(600, 800));
    let (_, calls) = fixture.run();

    assert!(calls.contains(&Call::Draw {
        target: DrawableRect::new(0, 0, 600, 800),
        width: 900,
        height: 1200,
    }));
}

#[test]
fn test_three_pages_report_thirds() {
    let fixture = Fixture::new(3, (600, 800), DrawableRect::sized(600, 800));
    let (events, _) = fixture.run();
    assert_eq!(progress(&events), vec![33, 66, 100]);
}

#[test]
fn test_call_order_for_three_pages() {
    let fixture = Fixture::new(3, (600, 800), DrawableRect::sized(600, 800));
    let (_, calls) = fixture.run();

    let draw = Call::Draw {
        target: DrawableRect::sized(600, 800),
        width: 600,
        height: 800,
    };
    assert_eq!(
        calls,
        vec![
            Call::Confirm,
            Call::Begin,
            Call::Rasterize(0),
            draw.clone(),
            Call::NewSheet,
            Call::Rasterize(1),
            draw.clone(),
            Call::NewSheet,
            Call::Rasterize(2),
            draw,
            Call::CloseDocument,
            Call::Finish,
            Call::Close,
        ]
    );
}

#[test]
fn test_sheet_advance_count_matches_pages() {
    for pages in 1..=6 {
        let fixture = Fixture::new(pages, (100, 100), DrawableRect::sized(100, 100));
        let (events, calls) = fixture.run();
        assert_eq!(count(&calls, &Call::NewSheet), pages - 1);
        let first_draw = calls.iter().position(|c| matches!(c, Call::Draw { .. }));
        let first_advance = calls.iter().position(|c| *c == Call::NewSheet);
        assert!(first_advance.is_none() || first_advance > first_draw);
        let last = calls.iter().rposition(|c| matches!(c, Call::Draw { .. }));
        let last_advance = calls.iter().rposition(|c| *c == Call::NewSheet);
        assert!(last_advance.is_none() || last_advance < last);
        assert_eq!(terminal_count(&events), 1);
    }
}

#[test]
fn test_selected_range_is_printed() {
    let mut fixture = Fixture::new(10, (100, 100), DrawableRect::sized(100, 100));
    fixture.device.confirmation =
        Confirmation::Accepted(PageSelection::Range { from: 3, to: 5 });
    let (events, calls) = fixture.run();

    let rasterized: Vec<usize> = calls
        .iter()
        .filter_map(|c| match c {
            Call::Rasterize(page) => Some(*page),
            _ => None,
        })
        .collect();
    assert_eq!(rasterized, vec![2, 3, 4]);
    assert_eq!(progress(&events), vec![33, 66, 100]);
}

#[test]
fn test_declined_confirmation_is_a_no_op() {
    let mut fixture = Fixture::new(4, (100, 100), DrawableRect::sized(100, 100));
    fixture.device.confirmation = Confirmation::Declined;
    let (events, calls) = fixture.run();

    assert!(progress(&events).is_empty());
    assert_eq!(calls, vec![Call::Confirm, Call::Close]);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], JobEvent::Finished(JobOutcome::Declined)));
}

#[test]
fn test_render_failure_aborts_remaining_pages() {
    let mut fixture = Fixture::new(5, (100, 100), DrawableRect::sized(100, 100));
    fixture.rasterizer.failing_page = Some(2);
    let (events, calls) = fixture.run();

    assert_eq!(progress(&events), vec![20, 40]);
    assert!(!calls.contains(&Call::Rasterize(3)));
    assert_eq!(count(&calls, &Call::CloseDocument), 1);
    assert_eq!(count(&calls, &Call::Abort), 1);
    assert_eq!(count(&calls, &Call::Finish), 0);
    assert_eq!(calls.last(), Some(&Call::Close));
    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(
        events.last(),
        Some(JobEvent::Finished(JobOutcome::Failed(PrintError::PageRender { page: 2, .. })))
    ));
}

#[test]
fn test_device_failure_is_fatal() {
    let mut fixture = Fixture::new(3, (100, 100), DrawableRect::sized(100, 100));
    fixture.device.failing_draw = Some(2);
    let (events, calls) = fixture.run();

    assert_eq!(progress(&events), vec![33]);
    assert!(!calls.contains(&Call::Rasterize(2)));
    assert_eq!(count(&calls, &Call::Abort), 1);
    assert_eq!(calls.last(), Some(&Call::Close));
    assert!(matches!(
        events.last(),
        Some(JobEvent::Finished(JobOutcome::Failed(PrintError::Device(_))))
    ));
}

#[test]
fn test_open_failure_still_signals_completion() {
    let mut fixture = Fixture::new(3, (100, 100), DrawableRect::sized(100, 100));
    fixture.rasterizer.open_fails = true;
    let (events, calls) = fixture.run();

    assert!(progress(&events).is_empty());
    assert_eq!(calls, vec![Call::Confirm, Call::Close]);
    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(
        events.last(),
        Some(JobEvent::Finished(JobOutcome::Failed(PrintError::DocumentOpen { .. })))
    ));
}

#[test]
fn test_range_beyond_document_fails() {
    let mut fixture = Fixture::new(3, (100, 100), DrawableRect::sized(100, 100));
    fixture.device.confirmation =
        Confirmation::Accepted(PageSelection::Range { from: 2, to: 9 });
    let (events, calls) = fixture.run();

    assert!(progress(&events).is_empty());
    assert!(!calls.contains(&Call::Begin));
    assert_eq!(count(&calls, &Call::CloseDocument), 1);
    assert_eq!(calls.last(), Some(&Call::Close));
    assert!(matches!(
        events.last(),
        Some(JobEvent::Finished(JobOutcome::Failed(PrintError::InvalidPageRange {
            from: 2,
            to: 9,
            page_count: 3
        })))
    ));
}

#[test]
fn test_centered_fit_mode_reaches_device() {
    let fixture = Fixture::new(1, (1000, 1000), DrawableRect::sized(600, 800));
    let (_, calls) = fixture.run_job(|job| job.with_fit_mode(FitMode::Centered));

    assert!(calls.contains(&Call::Draw {
        target: DrawableRect::new(0, 100, 600, 600),
        width: 1000,
        height: 1000,
    }));
}

#[test]
fn test_missing_document_is_rejected_before_start() {
    let fixture = Fixture::new(1, (100, 100), DrawableRect::sized(100, 100));
    let log = fixture.log.clone();
    let result = PrintJobRunner::new(Box::new(fixture.rasterizer), Box::new(fixture.device))
        .spawn(JobDescriptor::new("/no/such/document.pdf", 1.0));

    assert!(matches!(result, Err(PrintError::InvalidInput { .. })));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_inline_run_reports_through_sender() {
    let fixture = Fixture::new(2, (100, 100), DrawableRect::sized(100, 100));
    let job = fixture.job();
    let (sender, receiver) = channel(1);

    // capacity 1: the job blocks until the observer drains each event
    let worker = std::thread::spawn(move || {
        PrintJobRunner::new(Box::new(fixture.rasterizer), Box::new(fixture.device))
            .run(&job, sender);
        drop(fixture.document);
    });

    let events: Vec<JobEvent> = receiver.collect();
    worker.join().unwrap();

    assert_eq!(progress(&events), vec![50, 100]);
    assert_eq!(terminal_count(&events), 1);
}

#[test]
fn test_wait_returns_outcome() {
    let fixture = Fixture::new(2, (100, 100), DrawableRect::sized(100, 100));
    let job = fixture.job();
    let handle = PrintJobRunner::new(Box::new(fixture.rasterizer), Box::new(fixture.device))
        .spawn(job)
        .unwrap();

    assert!(matches!(handle.wait(), JobOutcome::Completed { pages: 2 }));
}

#[test]
fn test_panicking_render_still_releases_device() {
    let mut fixture = Fixture::new(3, (100, 100), DrawableRect::sized(100, 100));
    fixture.rasterizer.panicking_page = Some(1);
    let (events, calls) = fixture.run();

    assert_eq!(progress(&events), vec![33]);
    assert_eq!(count(&calls, &Call::CloseDocument), 1);
    assert_eq!(count(&calls, &Call::Abort), 1);
    assert_eq!(count(&calls, &Call::Finish), 0);
    assert_eq!(calls.last(), Some(&Call::Close));
    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(
        events.last(),
        Some(JobEvent::Finished(JobOutcome::Failed(PrintError::Interrupted)))
    ));
}

#[test]
fn test_sheet_without_drawable_area_fails_the_job() {
    let fixture = Fixture::new(2, (100, 100), DrawableRect::sized(100, 100));
    let out = tempfile::tempdir().unwrap();
    let dialog = TerminalDialog::new(std::io::Cursor::new(b"\n".to_vec()), Vec::new());
    // 150 mm on each edge of an A4 sheet leaves nothing to draw into
    let sheets = SheetDevice::new(
        Box::new(dialog),
        SheetLayout::new(Paper::A4, 50, 150.0),
        out.path().join("sheets"),
        "job",
    );

    let job = fixture.job();
    let outcome = PrintJobRunner::new(Box::new(fixture.rasterizer), Box::new(sheets))
        .spawn(job)
        .unwrap()
        .wait();

    assert!(matches!(
        outcome,
        JobOutcome::Failed(PrintError::Device(DeviceError::EmptyArea(_)))
    ));
    assert!(!out.path().join("sheets").exists());
}
