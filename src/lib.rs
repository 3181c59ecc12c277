//! hotkey-timer: elapsed-time tracker driven by global hotkeys
//!
//! The daemon provides:
//! - Global Shift+1/2/3 detection (start, stop, reset) regardless of focus
//! - A one-second tick loop behind an explicit Idle/Running state machine
//! - Plain-text persistence of the elapsed time as `HH:MM:SS`
//! - IPC server for a window or menu bar app to drive and display the timer

pub mod cleanup;
pub mod config;
pub mod events;
pub mod hotkey;
pub mod ipc;
pub mod lifecycle;
pub mod state;
pub mod store;
