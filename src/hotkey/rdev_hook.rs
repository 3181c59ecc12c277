//! Global hotkey backend built on `rdev`
//!
//! `rdev::listen` is a blocking, listen-only hook: events reach the focused
//! application untouched. It has no shutdown API, so the hook thread is
//! spawned once and lives until the process exits. `stop()` detaches the
//! subscriber and the callback goes quiet; a later `start()` attaches a new
//! one without installing a second hook.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rdev::{Event, EventType, Key};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::keys::{match_hotkey, DigitKey, ModifierState};
use super::listener::{deliver, HotkeyBackend, HotkeyError};
use crate::events::TimerCommand;

/// How long to wait for `rdev::listen` to fail before assuming it is up
const INSTALL_GRACE: Duration = Duration::from_millis(250);

type Subscriber = Arc<Mutex<Option<mpsc::Sender<TimerCommand>>>>;

fn digit_from_key(key: Key) -> Option<DigitKey> {
    match key {
        Key::Num1 => Some(DigitKey::One),
        Key::Num2 => Some(DigitKey::Two),
        Key::Num3 => Some(DigitKey::Three),
        _ => None,
    }
}

/// Feeds raw key events through Shift tracking and the hotkey filter
#[derive(Debug, Default)]
struct KeyFilter {
    modifiers: ModifierState,
}

impl KeyFilter {
    fn on_event(&mut self, event_type: &EventType) -> Option<TimerCommand> {
        match *event_type {
            EventType::KeyPress(Key::ShiftLeft) => self.modifiers.shift_left = true,
            EventType::KeyRelease(Key::ShiftLeft) => self.modifiers.shift_left = false,
            EventType::KeyPress(Key::ShiftRight) => self.modifiers.shift_right = true,
            EventType::KeyRelease(Key::ShiftRight) => self.modifiers.shift_right = false,
            EventType::KeyPress(key) => return match_hotkey(self.modifiers, digit_from_key(key)),
            _ => {}
        }
        None
    }
}

/// rdev-backed hotkey hook
pub struct RdevHotkeyBackend {
    subscriber: Subscriber,
    running: Arc<AtomicBool>,
    hook_installed: bool,
}

impl RdevHotkeyBackend {
    pub fn new() -> Self {
        Self {
            subscriber: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            hook_installed: false,
        }
    }

    fn set_subscriber(&self, sink: Option<mpsc::Sender<TimerCommand>>) {
        match self.subscriber.lock() {
            Ok(mut guard) => *guard = sink,
            Err(poisoned) => *poisoned.into_inner() = sink,
        }
    }

    fn install_hook(&mut self) -> Result<(), HotkeyError> {
        let subscriber = Arc::clone(&self.subscriber);
        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");
                let mut filter = KeyFilter::default();
                let callback = move |event: Event| {
                    let Some(command) = filter.on_event(&event.event_type) else {
                        return;
                    };
                    if let Ok(guard) = subscriber.lock() {
                        if let Some(sink) = guard.as_ref() {
                            deliver(sink, command);
                        }
                    }
                };

                if let Err(e) = rdev::listen(callback) {
                    error!(?e, "keyboard hook failed");
                    running.store(false, Ordering::SeqCst);
                    let _ = ready_tx.send(format!("{:?}", e));
                }
            })
            .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

        match ready_rx.recv_timeout(INSTALL_GRACE) {
            Ok(reason) => Err(HotkeyError::HookInstall(reason)),
            Err(_) => {
                self.hook_installed = true;
                Ok(())
            }
        }
    }
}

impl HotkeyBackend for RdevHotkeyBackend {
    fn start(&mut self, sink: mpsc::Sender<TimerCommand>) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        self.set_subscriber(Some(sink));
        if !self.hook_installed {
            if let Err(e) = self.install_hook() {
                self.set_subscriber(None);
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.set_subscriber(None);
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_digit_is_ignored() {
        let mut filter = KeyFilter::default();
        assert_eq!(filter.on_event(&EventType::KeyPress(Key::Num1)), None);
    }

    #[test]
    fn test_shift_digit_is_matched() {
        let mut filter = KeyFilter::default();
        assert_eq!(filter.on_event(&EventType::KeyPress(Key::ShiftLeft)), None);
        assert_eq!(
            filter.on_event(&EventType::KeyPress(Key::Num1)),
            Some(TimerCommand::Start)
        );
        assert_eq!(
            filter.on_event(&EventType::KeyPress(Key::Num3)),
            Some(TimerCommand::Reset)
        );
    }

    #[test]
    fn test_release_clears_shift() {
        let mut filter = KeyFilter::default();
        filter.on_event(&EventType::KeyPress(Key::ShiftRight));
        filter.on_event(&EventType::KeyRelease(Key::ShiftRight));
        assert_eq!(filter.on_event(&EventType::KeyPress(Key::Num2)), None);
    }

    #[test]
    fn test_either_shift_keeps_modifier_held() {
        let mut filter = KeyFilter::default();
        filter.on_event(&EventType::KeyPress(Key::ShiftLeft));
        filter.on_event(&EventType::KeyPress(Key::ShiftRight));
        filter.on_event(&EventType::KeyRelease(Key::ShiftLeft));
        assert_eq!(
            filter.on_event(&EventType::KeyPress(Key::Num2)),
            Some(TimerCommand::Stop)
        );
    }

    #[test]
    fn test_other_keys_pass_through() {
        let mut filter = KeyFilter::default();
        filter.on_event(&EventType::KeyPress(Key::ShiftLeft));
        assert_eq!(filter.on_event(&EventType::KeyPress(Key::Num4)), None);
        assert_eq!(filter.on_event(&EventType::KeyPress(Key::KeyA)), None);
    }

    #[test]
    fn test_backend_starts_idle() {
        let backend = RdevHotkeyBackend::new();
        assert!(!backend.is_running());
    }
}
