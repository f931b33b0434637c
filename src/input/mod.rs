//! # Input Module
//!
//! Input device handling: logical control bindings, gamepad and keyboard
//! readers, and the event type flowing from both into the session loop.
//!
//! Both readers run as background threads that translate raw evdev events
//! into [`InputEvent`]s on a single ordered channel. The session drains the
//! channel once per loop iteration, so all state mutation stays on one
//! logical thread.

pub mod binding;
pub mod gamepad;
pub mod keyboard;

/// A bound keyboard key.
///
/// Only the keys in the stock layout are represented; anything else is
/// dropped by the keyboard reader before it reaches the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Arrow up: forward
    ArrowUp,
    /// Arrow down: backward
    ArrowDown,
    /// Arrow left: left
    ArrowLeft,
    /// Arrow right: right
    ArrowRight,
    /// W: ascend
    W,
    /// S: descend
    S,
    /// A: yaw counter-clockwise
    A,
    /// D: yaw clockwise
    D,
    /// T: takeoff
    T,
    /// L: land
    L,
    /// Escape: quit the session
    Escape,
}

/// A single normalized input occurrence delivered to the session loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Keyboard key press or release.
    Key { key: Key, pressed: bool },
    /// Gamepad analog axis motion, already normalized to [-1, 1].
    PadAxis { axis: u8, value: f32 },
    /// Gamepad button press or release.
    PadButton { button: u8, pressed: bool },
    /// Gamepad directional pad motion. Components are -1, 0 or 1 with
    /// up and right positive.
    PadHat { pad: u8, x: i8, y: i8 },
    /// Explicit quit signal (reader thread lost its device, or a
    /// synthetic quit injected by tests).
    Quit,
}
