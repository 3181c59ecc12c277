//! hotkey-timer-cleanup: remove the per-user data folder on uninstall
//!
//! Takes no arguments. Best effort: failures are logged and the process still
//! exits successfully so an uninstaller never aborts because of it.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hotkey_timer::cleanup::{remove_data_dir, CleanupOutcome};
use hotkey_timer::config::Config;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(%e, "could not locate the data folder");
            return;
        }
    };

    match remove_data_dir(&config) {
        Ok(CleanupOutcome::Removed) => {
            info!(path = %config.data_dir.display(), "data folder removed successfully");
        }
        Ok(CleanupOutcome::NothingToRemove) => {
            info!(path = %config.data_dir.display(), "no data folder to remove");
        }
        Err(e) => {
            error!(path = %config.data_dir.display(), %e, "error removing data folder");
        }
    }
}
