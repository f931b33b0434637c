//! # Control Module
//!
//! The input-to-command translation engine: the authoritative control
//! state, the per-tick gamepad mapper, and the keyboard translator.
//!
//! Both translators write into one [`ControlState`](state::ControlState) and
//! surface discrete one-shot [`Command`]s to the session, which owns all
//! vehicle I/O. The translators themselves never touch the link, so every
//! decision in this module is synchronous and directly testable.

pub mod keys;
pub mod mapper;
pub mod state;

/// Direction of a flip maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Forward,
    Back,
    Left,
    Right,
}

/// A discrete one-shot command, dispatched immediately on its trigger edge
/// rather than on the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Take off and start transmitting velocities.
    Takeoff,
    /// Land and stop transmitting velocities.
    Land,
    /// Cut motors immediately and stop transmitting velocities.
    EmergencyStop,
    /// Perform a flip in the given direction.
    Flip(FlipDirection),
}
