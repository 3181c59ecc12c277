//! Hotkey definitions and modifier tracking
//!
//! Shift+1 starts, Shift+2 stops, Shift+3 resets. Every other combination is
//! ignored. Backends translate platform key codes into [`DigitKey`] and
//! [`ModifierState`] and let [`match_hotkey`] decide.

use crate::events::TimerCommand;

/// Digit keys on the main keyboard row that carry a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitKey {
    One,
    Two,
    Three,
}

impl DigitKey {
    /// Command bound to this digit
    pub fn command(self) -> TimerCommand {
        match self {
            DigitKey::One => TimerCommand::Start,
            DigitKey::Two => TimerCommand::Stop,
            DigitKey::Three => TimerCommand::Reset,
        }
    }
}

/// Tracks which Shift keys are currently pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Left Shift is held
    pub shift_left: bool,
    /// Right Shift is held
    pub shift_right: bool,
}

impl ModifierState {
    /// State where the platform only reports "some Shift is down"
    pub fn with_shift(shift: bool) -> Self {
        Self {
            shift_left: shift,
            shift_right: false,
        }
    }

    /// Check if either Shift key is held
    pub fn is_shift(&self) -> bool {
        self.shift_left || self.shift_right
    }
}

/// Decide whether a keydown is one of our hotkeys
pub fn match_hotkey(modifiers: ModifierState, key: Option<DigitKey>) -> Option<TimerCommand> {
    if !modifiers.is_shift() {
        return None;
    }
    key.map(DigitKey::command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state() {
        let state = ModifierState::default();
        assert!(!state.is_shift());
        assert_eq!(match_hotkey(state, Some(DigitKey::One)), None);
    }

    #[test]
    fn test_either_shift_counts() {
        let left = ModifierState {
            shift_left: true,
            shift_right: false,
        };
        let right = ModifierState {
            shift_left: false,
            shift_right: true,
        };
        assert!(left.is_shift());
        assert!(right.is_shift());
        assert!(ModifierState::with_shift(true).is_shift());
    }

    #[test]
    fn test_shift_digits_map_to_commands() {
        let shift = ModifierState::with_shift(true);
        assert_eq!(match_hotkey(shift, Some(DigitKey::One)), Some(TimerCommand::Start));
        assert_eq!(match_hotkey(shift, Some(DigitKey::Two)), Some(TimerCommand::Stop));
        assert_eq!(match_hotkey(shift, Some(DigitKey::Three)), Some(TimerCommand::Reset));
    }

    #[test]
    fn test_other_keys_ignored() {
        assert_eq!(match_hotkey(ModifierState::with_shift(true), None), None);
    }
}
