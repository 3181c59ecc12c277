//! Timer state machine
//!
//! Two states:
//! - Idle: no tick loop exists
//! - Running: one tick loop adds a second to the counter every second
//!
//! The controller's own task is where display refreshes and saves happen;
//! the tick loop only increments the shared counter and posts a tick back.

mod machine;
mod ticker;

pub use machine::{ControllerRequest, State, TimerController, TimerSnapshot};
