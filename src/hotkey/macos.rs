//! Global hotkey backend using macOS CGEventTap
//!
//! The tap is listen-only, so macOS delivers every event to the focused
//! application whatever the callback does. Runs on a dedicated thread with
//! its own CFRunLoop. Requires the Accessibility permission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventTapProxy, CGEventType, EventField,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::keys::{match_hotkey, DigitKey, ModifierState};
use super::listener::{deliver, HotkeyBackend, HotkeyError};
use crate::events::TimerCommand;

/// ANSI virtual keycodes of the digit row
const KEYCODE_1: i64 = 0x12;
const KEYCODE_2: i64 = 0x13;
const KEYCODE_3: i64 = 0x14;

/// How long the run loop runs before re-checking the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn digit_from_keycode(keycode: i64) -> Option<DigitKey> {
    match keycode {
        KEYCODE_1 => Some(DigitKey::One),
        KEYCODE_2 => Some(DigitKey::Two),
        KEYCODE_3 => Some(DigitKey::Three),
        _ => None,
    }
}

/// CGEventTap-backed hotkey hook
pub struct MacOSHotkeyBackend {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MacOSHotkeyBackend {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl HotkeyBackend for MacOSHotkeyBackend {
    /// Spawns the listener thread and waits until the tap is installed
    fn start(&mut self, sink: mpsc::Sender<TimerCommand>) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let spawned = thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");
                run_event_loop(sink, Arc::clone(&running), ready_tx);
                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(HotkeyError::ThreadSpawn(e.to_string()));
            }
        };

        let installed = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(HotkeyError::HookInstall("listener thread exited".into())));
        if let Err(e) = installed {
            self.running.store(false, Ordering::SeqCst);
            let _ = handle.join();
            return Err(e);
        }

        self.thread = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            // The run loop wakes within POLL_INTERVAL and sees the flag
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Run the CFRunLoop with the event tap until `running` is cleared
fn run_event_loop(
    sink: mpsc::Sender<TimerCommand>,
    running: Arc<AtomicBool>,
    ready: std::sync::mpsc::Sender<Result<(), HotkeyError>>,
) {
    // CGEventTap callback - must be fast and non-blocking
    let callback = move |_proxy: CGEventTapProxy, event_type: CGEventType, event: &CGEvent| -> Option<CGEvent> {
        match event_type {
            CGEventType::KeyDown => {
                let keycode = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
                let shift = event.get_flags().contains(CGEventFlags::CGEventFlagShift);
                if let Some(command) =
                    match_hotkey(ModifierState::with_shift(shift), digit_from_keycode(keycode))
                {
                    deliver(&sink, command);
                }
            }
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                warn!("event tap disabled, hotkeys may be missed");
            }
            _ => {}
        }
        Some(event.clone())
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create event tap - is Accessibility permission granted?");
            let _ = ready.send(Err(HotkeyError::HookInstall(
                "CGEventTap creation refused, check Accessibility permissions".into(),
            )));
            return;
        }
    };

    let run_loop_source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready.send(Err(HotkeyError::HookInstall(
                "failed to create run loop source".into(),
            )));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    tap.enable();

    info!("event tap created and enabled");
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, POLL_INTERVAL, true);
        }
    }

    // Tap is removed when it goes out of scope
}
