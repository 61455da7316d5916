//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::device::Paper;
use crate::fit::FitMode;
use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "pdfspool")]
#[command(version)]
#[command(about = "Print a PDF through the system print pipeline as raster sheets", long_about = None)]
pub struct Cli {
    /// PDF document to print
    #[arg(value_name = "FILE")]
    pub document: PathBuf,

    /// Page raster resolution in dots per inch
    #[arg(long)]
    pub dpi: Option<f32>,

    /// Paper size of the sheets
    #[arg(long, value_enum)]
    pub paper: Option<Paper>,

    /// Resolution of the sheet canvas
    #[arg(long)]
    pub device_dpi: Option<u32>,

    /// Unprintable border on every edge, in millimetres
    #[arg(long)]
    pub margin_mm: Option<f32>,

    /// Center pages on the sheet instead of anchoring them top-left
    #[arg(long)]
    pub center: bool,

    /// Directory that receives the rendered sheets
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Submit the sheets to the system spooler when done
    #[arg(long)]
    pub spool: bool,

    /// Spooler command line; sheet files are appended
    #[arg(long, value_name = "CMD")]
    pub spool_command: Option<String>,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "PATH", default_value = "pdfspool.log")]
    pub log_file: PathBuf,

    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Cli {
    /// Settings from the config file with command-line overrides applied
    #[must_use]
    pub fn settings(&self) -> Settings {
        let mut settings = match &self.config {
            Some(path) => Settings::load_from(path),
            None => Settings::load(),
        };
        self.apply(&mut settings);
        settings
    }

    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dpi) = self.dpi {
            settings.dpi = dpi;
        }
        if let Some(paper) = self.paper {
            settings.paper = paper;
        }
        if let Some(device_dpi) = self.device_dpi {
            settings.device_dpi = device_dpi;
        }
        if let Some(margin_mm) = self.margin_mm {
            settings.margin_mm = margin_mm;
        }
        if self.center {
            settings.fit_mode = FitMode::Centered;
        }
        if let Some(output) = &self.output {
            settings.output_dir = Some(output.clone());
        }
        if let Some(command) = &self.spool_command {
            settings.spool_command = command.clone();
        }
    }

    /// Sheet file prefix, taken from the document name
    #[must_use]
    pub fn job_name(&self) -> String {
        self.document
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "sheet".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "pdfspool",
            "report.pdf",
            "--dpi",
            "150",
            "--paper",
            "letter",
            "--center",
            "--spool-command",
            "lpr -P office",
        ])
        .unwrap();

        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.dpi, 150.0);
        assert_eq!(settings.paper, Paper::Letter);
        assert_eq!(settings.fit_mode, FitMode::Centered);
        assert_eq!(settings.spool_command, "lpr -P office");
        assert_eq!(settings.device_dpi, Settings::default().device_dpi);
        assert_eq!(cli.job_name(), "report");
        assert_eq!(cli.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_document_is_required() {
        assert!(Cli::try_parse_from(["pdfspool"]).is_err());
    }
}
