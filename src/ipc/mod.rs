//! IPC module for presentation-shell communication

mod protocol;
mod server;

pub use protocol::{Notification, Request, Response, TimerStatus};
pub use server::{ControlHandles, Server};
