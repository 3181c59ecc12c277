//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::events::StateEvent;
use crate::state::{State, TimerSnapshot};
use crate::store::format_hms;

/// Requests from a control surface to the timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current timer status
    GetStatus,

    /// Same as Shift+1
    Start,

    /// Same as Shift+2
    Stop,

    /// Same as Shift+3
    Reset,

    /// Persist to a different output file (must be absolute)
    SetOutputPath { path: PathBuf },

    /// Ping to check connectivity
    Ping,

    /// Subscribe to state change notifications
    Subscribe,
}

/// Responses from the timer to a control surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current timer status
    Status(TimerStatus),

    /// Command accepted
    Ok,

    /// Output path now in use
    OutputPath { path: PathBuf },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification to subscribed clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// State event occurred
    Event { event: StateEvent },
}

/// Full timer status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    /// Daemon version
    pub version: String,

    /// Idle or running
    pub state: State,

    /// Counter in seconds
    pub elapsed_secs: u64,

    /// Counter as `HH:MM:SS`
    pub elapsed: String,

    /// File the counter is written to
    pub output_path: PathBuf,

    /// Whether the global hotkeys are installed
    pub hotkeys_active: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl TimerStatus {
    pub fn from_snapshot(snapshot: TimerSnapshot, hotkeys_active: bool, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: snapshot.state,
            elapsed: format_hms(snapshot.elapsed_secs),
            elapsed_secs: snapshot.elapsed_secs,
            output_path: snapshot.output_path,
            hotkeys_active,
            uptime_secs,
        }
    }
}
