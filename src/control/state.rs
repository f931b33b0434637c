//! # Control State
//!
//! The authoritative record of the four velocity axes and the armed flag.
//!
//! Velocities are clamped to [`-MAX_VELOCITY`, `MAX_VELOCITY`] at every
//! write, so the stored state is always a valid command regardless of which
//! input source produced it or how sources interleave. Mutation is
//! single-threaded: both translators run on the session loop.

/// Symmetric velocity bound on every axis.
pub const MAX_VELOCITY: i32 = 100;

/// The four velocity axes plus the armed flag.
///
/// `armed` gates transmission only: velocities keep being recorded while
/// disarmed, they just never leave the process. It becomes true only on a
/// takeoff trigger and false on land or emergency stop.
///
/// # Examples
///
/// ```
/// use tello_teleop::control::state::{ControlState, MAX_VELOCITY};
///
/// let mut state = ControlState::new();
/// state.set_lateral(250);
/// assert_eq!(state.lateral(), MAX_VELOCITY);
/// assert!(!state.is_armed());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlState {
    lateral: i32,
    longitudinal: i32,
    vertical: i32,
    yaw: i32,
    armed: bool,
}

impl ControlState {
    /// Creates a zeroed, disarmed state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Left/right velocity. Positive is right.
    #[must_use]
    pub fn lateral(&self) -> i32 {
        self.lateral
    }

    /// Forward/backward velocity. Positive is forward.
    #[must_use]
    pub fn longitudinal(&self) -> i32 {
        self.longitudinal
    }

    /// Up/down velocity. Positive is up.
    #[must_use]
    pub fn vertical(&self) -> i32 {
        self.vertical
    }

    /// Rotational velocity. Positive is clockwise.
    #[must_use]
    pub fn yaw(&self) -> i32 {
        self.yaw
    }

    /// All four axes as (lateral, longitudinal, vertical, yaw).
    #[must_use]
    pub fn velocity(&self) -> (i32, i32, i32, i32) {
        (self.lateral, self.longitudinal, self.vertical, self.yaw)
    }

    /// Whether velocity commands are being transmitted.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Sets the lateral velocity, clamped to the bound.
    pub fn set_lateral(&mut self, value: i32) {
        self.lateral = value.clamp(-MAX_VELOCITY, MAX_VELOCITY);
    }

    /// Sets the longitudinal velocity, clamped to the bound.
    pub fn set_longitudinal(&mut self, value: i32) {
        self.longitudinal = value.clamp(-MAX_VELOCITY, MAX_VELOCITY);
    }

    /// Sets the vertical velocity, clamped to the bound.
    pub fn set_vertical(&mut self, value: i32) {
        self.vertical = value.clamp(-MAX_VELOCITY, MAX_VELOCITY);
    }

    /// Sets the yaw velocity, clamped to the bound.
    pub fn set_yaw(&mut self, value: i32) {
        self.yaw = value.clamp(-MAX_VELOCITY, MAX_VELOCITY);
    }

    /// Starts transmitting velocity commands. Called on a takeoff trigger.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Stops transmitting velocity commands. Called on land or emergency.
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}
