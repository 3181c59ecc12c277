//! Persistence of the elapsed time and the chosen output file
//!
//! Both files are plain text so the output can be read by anything that
//! watches it (stream overlays, scripts, a text editor).

mod format;
mod timer_store;

pub use format::{format_hms, parse_hms, ParseError};
pub use timer_store::{LoadOutcome, StoreError, TimerStore};
