//! Hotkey module for global keyboard event listening
//!
//! Watches every keydown in the system for Shift+1/2/3 and turns them into
//! timer commands:
//! - macOS: CGEventTap (requires Accessibility permission)
//! - everywhere else: rdev

mod keys;
mod listener;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(target_os = "macos"))]
mod rdev_hook;

pub use keys::{match_hotkey, DigitKey, ModifierState};
pub use listener::{HotkeyBackend, HotkeyError, HotkeyListener};

/// The keyboard hook for the platform we were built for
pub fn platform_backend() -> Box<dyn HotkeyBackend> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacOSHotkeyBackend::new())
    }

    #[cfg(not(target_os = "macos"))]
    {
        Box::new(rdev_hook::RdevHotkeyBackend::new())
    }
}
