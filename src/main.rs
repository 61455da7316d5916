use std::fs::File;
use std::io::{Write, stderr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use simplelog::{Config, WriteLogger};

use pdfspool::cli::Cli;
use pdfspool::device::{SheetDevice, SpoolDevice, TerminalDialog};
use pdfspool::{
    JobDescriptor, JobEvent, JobOutcome, PrintDevice, PrintJobHandle, PrintJobRunner, Settings,
};

const TICK_RATE: Duration = Duration::from_millis(50);

fn main() -> ExitCode {
    better_panic::install();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(outcome) if outcome.is_failure() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Application error: {err:?}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<JobOutcome> {
    WriteLogger::init(
        cli.log_level,
        Config::default(),
        File::create(&cli.log_file)
            .with_context(|| format!("creating log file {:?}", cli.log_file))?,
    )?;
    info!("Starting pdfspool");

    let settings = cli.settings();
    let output_dir = settings
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.job_name()));

    let sheets = SheetDevice::new(
        Box::new(TerminalDialog::stdio()),
        settings.sheet_layout(),
        output_dir.clone(),
        cli.job_name(),
    );
    let device: Box<dyn PrintDevice> = if cli.spool {
        Box::new(SpoolDevice::new(sheets, &settings.spool_command))
    } else {
        Box::new(sheets)
    };
    let rasterizer = settings.backend.rasterizer()?;

    let job = JobDescriptor::at_dpi(&cli.document, settings.dpi).with_fit_mode(settings.fit_mode);
    let handle = PrintJobRunner::new(rasterizer, device)
        .with_channel_capacity(settings.channel_capacity)
        .spawn(job)?;

    let outcome = watch(handle, &settings)?;
    report(&outcome, &output_dir);
    info!("Shutting down pdfspool");
    Ok(outcome)
}

/// Event loop: stays responsive while the job runs
fn watch(mut handle: PrintJobHandle, settings: &Settings) -> Result<JobOutcome> {
    let mut err = stderr();
    info!(
        "Watching print job ({} dpi, backend {})",
        settings.dpi, settings.backend
    );

    loop {
        for event in handle.poll() {
            match event {
                JobEvent::Progress(percent) => {
                    write!(err, "\rPrint progress: {percent}")?;
                    err.flush()?;
                }
                JobEvent::Finished(outcome) => {
                    writeln!(err)?;
                    return Ok(outcome);
                }
            }
        }
        std::thread::sleep(TICK_RATE);
    }
}

fn report(outcome: &JobOutcome, output_dir: &std::path::Path) {
    match outcome {
        JobOutcome::Completed { pages } => {
            eprintln!("Printing completed: {pages} page(s), sheets in {}", output_dir.display());
        }
        JobOutcome::Declined => eprintln!("Printing cancelled"),
        JobOutcome::Failed(err) => eprintln!("Printing failed: {err}"),
    }
}

fn default_output_dir(job_name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pdfspool-{job_name}-{}", std::process::id()))
}
