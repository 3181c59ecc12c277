//! Commands flowing into the timer and events flowing out of it
//!
//! `TimerCommand` is what hotkeys and IPC clients ask for. `StateEvent` is
//! what the controller broadcasts after acting, and is the only thing a
//! presentation layer needs in order to render the timer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Start/stop/reset intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerCommand {
    /// Begin ticking (Shift+1)
    Start,
    /// Stop ticking (Shift+2)
    Stop,
    /// Zero the counter (Shift+3)
    Reset,
}

impl std::fmt::Display for TimerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerCommand::Start => write!(f, "start"),
            TimerCommand::Stop => write!(f, "stop"),
            TimerCommand::Reset => write!(f, "reset"),
        }
    }
}

/// Events emitted by the timer controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// Timer went from Idle to Running
    Started,

    /// Timer went from Running to Idle
    Stopped {
        /// Counter value at the moment of stopping
        elapsed_secs: u64,
    },

    /// The displayed time should be refreshed
    ElapsedChanged {
        elapsed_secs: u64,
        /// `HH:MM:SS` rendering of `elapsed_secs`
        display: String,
    },

    /// A new output file was chosen
    OutputPathChanged { path: PathBuf },

    /// Non-fatal problem the user should see once
    Warning { message: String },
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::Started => write!(f, "STARTED"),
            StateEvent::Stopped { elapsed_secs } => write!(f, "STOPPED ({}s)", elapsed_secs),
            StateEvent::ElapsedChanged { display, .. } => write!(f, "ELAPSED {}", display),
            StateEvent::OutputPathChanged { path } => {
                write!(f, "OUTPUT_PATH_CHANGED ({})", path.display())
            }
            StateEvent::Warning { message } => write!(f, "WARNING ({})", message),
        }
    }
}
