//! Global hotkey listener
//!
//! `HotkeyListener` owns exactly one platform backend. The backend installs
//! the system-wide keyboard hook on its own thread and pushes matched
//! commands into the listener's channel.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::events::TimerCommand;

/// Platform-agnostic keyboard hook interface
///
/// Implementations observe every keydown in the system, forward every event
/// unchanged to the rest of the OS chain, and send a [`TimerCommand`] into
/// `sink` when a Shift+digit hotkey is seen.
pub trait HotkeyBackend: Send {
    /// Install the hook. Fails if it is already installed or the OS refuses.
    fn start(&mut self, sink: mpsc::Sender<TimerCommand>) -> Result<(), HotkeyError>;

    /// Remove the hook
    fn stop(&mut self);

    /// Check if the hook is currently installed
    fn is_running(&self) -> bool;
}

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("failed to install keyboard hook: {0}")]
    HookInstall(String),

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

/// Global hotkey listener that turns Shift+1/2/3 into timer commands
pub struct HotkeyListener {
    backend: Box<dyn HotkeyBackend>,
    command_tx: mpsc::Sender<TimerCommand>,
}

impl HotkeyListener {
    /// Create a listener backed by this platform's hook
    pub fn new(command_tx: mpsc::Sender<TimerCommand>) -> Self {
        Self::with_backend(super::platform_backend(), command_tx)
    }

    /// Create a listener with an explicit backend
    pub fn with_backend(backend: Box<dyn HotkeyBackend>, command_tx: mpsc::Sender<TimerCommand>) -> Self {
        Self { backend, command_tx }
    }

    /// Start the hotkey listener
    pub fn start(&mut self) -> Result<(), HotkeyError> {
        self.backend.start(self.command_tx.clone())?;
        info!("global hotkeys active: Shift+1 start, Shift+2 stop, Shift+3 reset");
        Ok(())
    }

    /// Stop the hotkey listener
    pub fn stop(&mut self) {
        if self.backend.is_running() {
            self.backend.stop();
            info!("global hotkeys removed");
        }
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.backend.is_running()
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Hand a matched command to the subscriber without blocking the hook
pub(crate) fn deliver(sink: &mpsc::Sender<TimerCommand>, command: TimerCommand) {
    if let Err(e) = sink.try_send(command) {
        warn!(%command, %e, "dropping hotkey command");
    }
}
