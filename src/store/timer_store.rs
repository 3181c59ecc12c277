//! Plain-text persistence of the elapsed time and the chosen output path
//!
//! Two files are involved:
//! - the settings file, a single line holding the absolute output path
//! - the output file, a single line holding the elapsed time as `HH:MM:SS`
//!
//! Nothing here is fatal. Load problems degrade to defaults and are handed
//! back as warnings; write problems are returned to the caller, who reports
//! them without touching the in-memory counter.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;

use super::format::{format_hms, parse_hms};

/// Errors raised while reading or writing timer files
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("error loading settings from {path}: {source}")]
    ReadSettings { path: PathBuf, source: io::Error },

    #[error("error saving settings to {path}: {source}")]
    WriteSettings { path: PathBuf, source: io::Error },

    #[error("error loading timer state from {path}: {source}")]
    ReadOutput { path: PathBuf, source: io::Error },

    #[error("error saving timer state to {path}: {source}")]
    WriteOutput { path: PathBuf, source: io::Error },

    #[error("output path must be absolute: {0}")]
    NotAbsolute(PathBuf),
}

/// Result of [`TimerStore::load`]
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Elapsed seconds recovered from the output file (0 on any problem)
    pub elapsed: u64,
    /// Non-fatal problems the user should hear about
    pub warnings: Vec<StoreError>,
}

/// Owner of the output path and the two files backing the timer
#[derive(Debug, Clone)]
pub struct TimerStore {
    settings_path: PathBuf,
    output_path: PathBuf,
}

impl TimerStore {
    /// Load settings and the persisted elapsed time
    pub fn load(config: &Config) -> (Self, LoadOutcome) {
        let mut outcome = LoadOutcome::default();

        let output_path = match read_settings(&config.settings_path) {
            Ok(Some(path)) => path,
            Ok(None) => config.default_output_path.clone(),
            Err(e) => {
                outcome.warnings.push(e);
                config.default_output_path.clone()
            }
        };

        let store = Self {
            settings_path: config.settings_path.clone(),
            output_path,
        };
        info!(output_path = %store.output_path.display(), "timer store loaded");

        match std::fs::read_to_string(&store.output_path) {
            Ok(content) => {
                outcome.elapsed = parse_hms(&content).unwrap_or_else(|e| {
                    warn!(%e, "unreadable elapsed time, starting from zero");
                    0
                });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("output file missing, creating it");
                if let Err(e) = store.save(0) {
                    outcome.warnings.push(e);
                }
            }
            Err(source) => {
                outcome.warnings.push(StoreError::ReadOutput {
                    path: store.output_path.clone(),
                    source,
                });
            }
        }

        (store, outcome)
    }

    /// Current output path
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Overwrite the output file with `elapsed` formatted as `HH:MM:SS`
    pub fn save(&self, elapsed: u64) -> Result<(), StoreError> {
        std::fs::write(&self.output_path, format_hms(elapsed)).map_err(|source| {
            StoreError::WriteOutput {
                path: self.output_path.clone(),
                source,
            }
        })
    }

    /// Write the output path to the settings file
    pub fn save_settings(&self) -> Result<(), StoreError> {
        let contents = self.output_path.to_string_lossy();
        std::fs::write(&self.settings_path, contents.as_bytes()).map_err(|source| {
            StoreError::WriteSettings {
                path: self.settings_path.clone(),
                source,
            }
        })
    }

    /// Switch to a new output file
    ///
    /// A relative path is rejected and nothing changes. Otherwise the path is
    /// adopted, the settings file is written, then `elapsed` is written to the
    /// new path. Both writes are always attempted; their failures come back
    /// as warnings.
    pub fn set_output_path(
        &mut self,
        path: PathBuf,
        elapsed: u64,
    ) -> Result<Vec<StoreError>, StoreError> {
        if !path.is_absolute() {
            return Err(StoreError::NotAbsolute(path));
        }

        info!(from = %self.output_path.display(), to = %path.display(), "output path changed");
        self.output_path = path;

        let warnings = [self.save_settings(), self.save(elapsed)]
            .into_iter()
            .filter_map(Result::err)
            .collect();
        Ok(warnings)
    }
}

/// Returns the saved output path, or `None` when there is no usable one
fn read_settings(settings_path: &Path) -> Result<Option<PathBuf>, StoreError> {
    let content = match std::fs::read_to_string(settings_path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::ReadSettings {
                path: settings_path.to_path_buf(),
                source,
            })
        }
    };

    let saved = content.trim();
    if saved.is_empty() {
        return Ok(None);
    }

    let path = PathBuf::from(saved);
    if path.is_absolute() {
        Ok(Some(path))
    } else {
        warn!(path = saved, "ignoring relative output path in settings");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn config() -> (TempDir, Config) {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(tmp.path());
        (tmp, config)
    }

    #[test]
    fn test_first_run_creates_output_file() {
        let (_tmp, config) = config();
        let (store, outcome) = TimerStore::load(&config);

        assert_eq!(outcome.elapsed, 0);
        assert!(outcome.warnings.is_empty());
        assert_eq!(store.output_path(), config.default_output_path);
        assert_eq!(
            std::fs::read_to_string(&config.default_output_path).unwrap(),
            "00:00:00"
        );
    }

    #[test]
    fn test_load_reads_elapsed_from_saved_path() {
        let (tmp, config) = config();
        let custom = tmp.path().join("custom.txt");
        std::fs::write(&config.settings_path, custom.to_string_lossy().as_bytes()).unwrap();
        std::fs::write(&custom, "01:02:03").unwrap();

        let (store, outcome) = TimerStore::load(&config);
        assert_eq!(store.output_path(), custom);
        assert_eq!(outcome.elapsed, 3723);
    }

    #[test]
    fn test_relative_settings_path_falls_back_to_default() {
        let (_tmp, config) = config();
        std::fs::write(&config.settings_path, "relative/timer.txt").unwrap();

        let (store, outcome) = TimerStore::load(&config);
        assert_eq!(store.output_path(), config.default_output_path);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_malformed_output_file_yields_zero() {
        let (_tmp, config) = config();
        std::fs::write(&config.default_output_path, "not a time").unwrap();

        let (_store, outcome) = TimerStore::load(&config);
        assert_eq!(outcome.elapsed, 0);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_unreadable_output_is_a_warning() {
        let (_tmp, config) = config();
        // A directory where the file should be cannot be read as text
        std::fs::create_dir(&config.default_output_path).unwrap();

        let (_store, outcome) = TimerStore::load(&config);
        assert_eq!(outcome.elapsed, 0);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [StoreError::ReadOutput { .. }]
        ));
    }

    #[test]
    fn test_save_overwrites() {
        let (_tmp, config) = config();
        let (store, _) = TimerStore::load(&config);

        assert_ok!(store.save(90_061));
        assert_eq!(
            std::fs::read_to_string(store.output_path()).unwrap(),
            "25:01:01"
        );
    }

    #[test]
    fn test_save_failure_is_reported() {
        let (tmp, config) = config();
        let (mut store, _) = TimerStore::load(&config);
        store.output_path = tmp.path().join("missing-dir").join("out.txt");

        let err = assert_err!(store.save(1));
        assert!(matches!(err, StoreError::WriteOutput { .. }));
    }

    #[test]
    fn test_set_output_path_writes_settings_and_value() {
        let (tmp, config) = config();
        let (mut store, _) = TimerStore::load(&config);
        let new_path = tmp.path().join("new").join("path.txt");
        std::fs::create_dir_all(new_path.parent().unwrap()).unwrap();

        let warnings = assert_ok!(store.set_output_path(new_path.clone(), 42));
        assert!(warnings.is_empty());

        assert_eq!(
            std::fs::read_to_string(&config.settings_path).unwrap(),
            new_path.to_string_lossy()
        );
        assert_eq!(std::fs::read_to_string(&new_path).unwrap(), "00:00:42");
        assert_eq!(store.output_path(), new_path);
    }

    #[test]
    fn test_settings_failure_still_writes_new_output() {
        let (tmp, config) = config();
        let (mut store, _) = TimerStore::load(&config);
        // A directory in place of the settings file makes that write fail
        std::fs::create_dir(&config.settings_path).unwrap();
        let chosen = tmp.path().join("chosen.txt");

        let warnings = assert_ok!(store.set_output_path(chosen.clone(), 42));

        assert!(matches!(warnings.as_slice(), [StoreError::WriteSettings { .. }]));
        assert_eq!(std::fs::read_to_string(&chosen).unwrap(), "00:00:42");
        assert_eq!(store.output_path(), chosen);
    }

    #[test]
    fn test_both_write_failures_are_reported() {
        let (tmp, config) = config();
        let (mut store, _) = TimerStore::load(&config);
        std::fs::create_dir(&config.settings_path).unwrap();
        let unreachable = tmp.path().join("missing-dir").join("out.txt");

        let warnings = assert_ok!(store.set_output_path(unreachable, 1));

        assert!(matches!(
            warnings.as_slice(),
            [StoreError::WriteSettings { .. }, StoreError::WriteOutput { .. }]
        ));
    }

    #[test]
    fn test_set_output_path_rejects_relative() {
        let (_tmp, config) = config();
        let (mut store, _) = TimerStore::load(&config);

        let err = assert_err!(store.set_output_path(PathBuf::from("timer.txt"), 5));
        assert!(matches!(err, StoreError::NotAbsolute(_)));
        assert_eq!(store.output_path(), config.default_output_path);
    }

    #[test]
    fn test_saved_path_survives_reload() {
        let (tmp, config) = config();
        let new_path = tmp.path().join("elsewhere.txt");
        {
            let (mut store, _) = TimerStore::load(&config);
            assert_ok!(store.set_output_path(new_path.clone(), 7));
        }

        let (store, outcome) = TimerStore::load(&config);
        assert_eq!(store.output_path(), new_path);
        assert_eq!(outcome.elapsed, 7);
    }
}
