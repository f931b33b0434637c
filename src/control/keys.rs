//! # Keyboard Command Translator
//!
//! Maps key press/release edges to velocity writes and one-shot commands.
//!
//! A press sets its axis to the fixed speed constant `S`; a release of
//! either key of an opposed pair (up/down, left/right, W/S, A/D) zeroes that
//! axis. Releasing one key of a pair always zeroes — it does not restore the
//! other key's contribution even if that key is still held. This is a known
//! simplification of the control scheme and is covered by tests.
//!
//! T takes off on press; L lands on release. Unbound keys are ignored. The
//! translator holds no per-key state: it only writes into [`ControlState`]
//! and reports the command to dispatch.

use super::state::ControlState;
use super::Command;
use crate::input::Key;

/// Translates keyboard edges into control-state updates.
#[derive(Debug, Clone, Copy)]
pub struct KeyboardTranslator {
    /// Velocity magnitude written by a key press (the `S` constant).
    speed: i32,
}

impl KeyboardTranslator {
    /// Creates a translator with the given key press speed.
    #[must_use]
    pub fn new(speed: i32) -> Self {
        Self { speed }
    }

    /// The configured key press speed.
    #[must_use]
    pub fn speed(&self) -> i32 {
        self.speed
    }

    /// Handles a key press edge. Returns the command to dispatch, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use tello_teleop::control::keys::KeyboardTranslator;
    /// use tello_teleop::control::state::ControlState;
    /// use tello_teleop::input::Key;
    ///
    /// let translator = KeyboardTranslator::new(60);
    /// let mut state = ControlState::new();
    ///
    /// assert!(translator.key_down(Key::W, &mut state).is_none());
    /// assert_eq!(state.vertical(), 60);
    /// ```
    pub fn key_down(&self, key: Key, state: &mut ControlState) -> Option<Command> {
        match key {
            Key::ArrowUp => state.set_longitudinal(self.speed),
            Key::ArrowDown => state.set_longitudinal(-self.speed),
            Key::ArrowLeft => state.set_lateral(-self.speed),
            Key::ArrowRight => state.set_lateral(self.speed),
            Key::W => state.set_vertical(self.speed),
            Key::S => state.set_vertical(-self.speed),
            Key::A => state.set_yaw(-self.speed),
            Key::D => state.set_yaw(self.speed),
            Key::T => {
                state.arm();
                return Some(Command::Takeoff);
            }
            Key::L | Key::Escape => {}
        }
        None
    }

    /// Handles a key release edge. Returns the command to dispatch, if any.
    pub fn key_up(&self, key: Key, state: &mut ControlState) -> Option<Command> {
        match key {
            Key::ArrowUp | Key::ArrowDown => state.set_longitudinal(0),
            Key::ArrowLeft | Key::ArrowRight => state.set_lateral(0),
            Key::W | Key::S => state.set_vertical(0),
            Key::A | Key::D => state.set_yaw(0),
            Key::L => {
                state.disarm();
                return Some(Command::Land);
            }
            Key::T | Key::Escape => {}
        }
        None
    }
}
