use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::device::{Paper, SheetLayout};
use crate::fit::FitMode;
use crate::raster::RasterBackend;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdfspool";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Page raster resolution
    #[serde(default = "default_dpi")]
    pub dpi: f32,

    #[serde(default)]
    pub backend: RasterBackend,

    #[serde(default)]
    pub fit_mode: FitMode,

    #[serde(default)]
    pub paper: Paper,

    /// Resolution of the sheet canvas
    #[serde(default = "default_device_dpi")]
    pub device_dpi: u32,

    #[serde(default)]
    pub margin_mm: f32,

    /// Where sheets are written; a fresh temp directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(default = "default_spool_command")]
    pub spool_command: String,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_dpi() -> f32 {
    300.0
}

fn default_device_dpi() -> u32 {
    150
}

fn default_spool_command() -> String {
    crate::device::DEFAULT_SPOOL_COMMAND.to_string()
}

fn default_channel_capacity() -> usize {
    crate::job::DEFAULT_CHANNEL_CAPACITY
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            dpi: default_dpi(),
            backend: RasterBackend::default(),
            fit_mode: FitMode::default(),
            paper: Paper::default(),
            device_dpi: default_device_dpi(),
            margin_mm: 0.0,
            output_dir: None,
            spool_command: default_spool_command(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Settings {
    /// Sheet geometry described by these settings
    #[must_use]
    pub fn sheet_layout(&self) -> SheetLayout {
        SheetLayout::new(self.paper, self.device_dpi, self.margin_mm)
    }

    /// Load from the default location, falling back to defaults
    #[must_use]
    pub fn load() -> Self {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                let settings = Self::default();
                if let Err(e) = settings.save_to(&path) {
                    warn!("Could not write default settings to {path:?}: {e}");
                }
                settings
            }
            None => {
                warn!("Could not determine config directory, using default settings");
                Self::default()
            }
        }
    }

    /// Load from `path`. Unreadable or malformed files yield defaults.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to read settings file {path:?}: {e}");
                return Self::default();
            }
        };

        match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");
                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                }
                settings
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, generate_settings_yaml(self))?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }
}

/// `<config dir>/pdfspool/config.yaml`
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str("# Page raster resolution; higher is sharper and slower\n");
    content.push_str(&format!("dpi: {}\n", settings.dpi));
    content.push_str(&format!("backend: {}\n", settings.backend.as_str()));
    content.push_str("# origin | centered\n");
    content.push_str(&format!("fit_mode: {}\n", settings.fit_mode.as_str()));
    content.push_str("# a4 | a3 | letter | legal\n");
    content.push_str(&format!("paper: {}\n", settings.paper.as_str()));
    content.push_str(&format!("device_dpi: {}\n", settings.device_dpi));
    content.push_str(&format!("margin_mm: {}\n", settings.margin_mm));
    if let Some(dir) = &settings.output_dir {
        content.push_str(&format!("output_dir: {:?}\n", dir.display().to_string()));
    }
    content.push_str(&format!("spool_command: {:?}\n", settings.spool_command));
    content.push_str(&format!(
        "channel_capacity: {}\n",
        settings.channel_capacity
    ));

    content
}
