//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "HOTKEY_TIMER_DATA_DIR";

/// Name of the settings file holding the chosen output path
pub const SETTINGS_FILE: &str = "settings.txt";

/// Default name of the elapsed-time output file
pub const OUTPUT_FILE: &str = "TimerOutput.txt";

const SOCKET_FILE: &str = "timer.sock";
const APP_NAME: &str = "HotkeyTimer";

/// Timer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-user directory holding every file this tool writes
    pub data_dir: PathBuf,

    /// Settings file (single line: the output path)
    pub settings_path: PathBuf,

    /// Output path used when no valid path has been saved
    pub default_output_path: PathBuf,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let override_dir = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        let data_dir = resolve_data_dir(override_dir)?;
        Ok(Self::with_data_dir(data_dir))
    }

    /// Build a configuration rooted at an explicit data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            settings_path: data_dir.join(SETTINGS_FILE),
            default_output_path: data_dir.join(OUTPUT_FILE),
            socket_path: data_dir.join(SOCKET_FILE),
            data_dir,
        }
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn resolve_data_dir(override_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }

    let dirs = ProjectDirs::from("", "", APP_NAME)
        .context("could not determine the per-user data directory")?;
    Ok(dirs.data_local_dir().to_path_buf())
}
