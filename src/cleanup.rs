//! Uninstall helper: removes every file this tool has written

use std::io;
use std::path::Path;

use tracing::info;

use crate::config::Config;

/// What [`remove_data_dir`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The data directory existed and is gone now
    Removed,
    /// There was no data directory
    NothingToRemove,
}

/// Delete the data directory and everything in it
///
/// An output file the user moved outside the data directory is left alone.
pub fn remove_data_dir(config: &Config) -> io::Result<CleanupOutcome> {
    remove_dir(&config.data_dir)
}

fn remove_dir(dir: &Path) -> io::Result<CleanupOutcome> {
    if !dir.exists() {
        return Ok(CleanupOutcome::NothingToRemove);
    }

    std::fs::remove_dir_all(dir)?;
    info!(path = %dir.display(), "data directory removed");
    Ok(CleanupOutcome::Removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_directory_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(tmp.path().join("HotkeyTimer"));
        config.ensure_dirs().unwrap();
        std::fs::write(&config.settings_path, "/tmp/x.txt").unwrap();
        std::fs::write(&config.default_output_path, "00:00:01").unwrap();

        assert_eq!(remove_data_dir(&config).unwrap(), CleanupOutcome::Removed);
        assert!(!config.data_dir.exists());
    }

    #[test]
    fn test_missing_directory_is_fine() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(tmp.path().join("never-created"));

        assert_eq!(remove_data_dir(&config).unwrap(), CleanupOutcome::NothingToRemove);
    }
}
