//! # Logical Control Bindings
//!
//! A [`LogicalControl`] names one mapped physical input on the gamepad:
//! an analog axis, a button, or one component of a directional pad, plus an
//! inversion flag. Sampling a control against a [`PadSnapshot`] yields a
//! single signed scalar:
//!
//! | Kind   | Domain      | Sampled value            |
//! |--------|-------------|--------------------------|
//! | Axis   | [-1, 1]     | raw axis value           |
//! | Button | {0, 1}      | 1.0 while pressed        |
//! | Pad    | {-1, 0, 1}  | selected component       |
//!
//! The inversion flag multiplies the result by -1, which lets a button act
//! as a negative contribution (a "down" button subtracted from an "up"
//! button) and lets one pad axis serve two opposite flip bindings.
//!
//! Sampling is a pure read with no side effects. Controls are built once at
//! startup from the binding table in the configuration and never change.

use super::gamepad::PadSnapshot;

/// The physical kind of a mapped control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Continuous analog channel reporting [-1, 1].
    Axis,
    /// Digital button reporting pressed / released.
    Button,
    /// Discrete 2-D directional pad; `component` selects X (0) or Y (1).
    Pad,
}

/// Directional pad component indices.
pub const PAD_X: u8 = 0;
/// Directional pad component indices.
pub const PAD_Y: u8 = 1;

/// One mapped physical input. Immutable once configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalControl {
    kind: ControlKind,
    index: u8,
    /// Pad sub-axis (PAD_X or PAD_Y); unused for axes and buttons.
    component: u8,
    invert: bool,
}

impl LogicalControl {
    /// Binds an analog axis.
    ///
    /// # Examples
    ///
    /// ```
    /// use tello_teleop::input::binding::LogicalControl;
    /// use tello_teleop::input::gamepad::PadSnapshot;
    ///
    /// let mut snap = PadSnapshot::default();
    /// snap.set_axis(0, 0.5);
    ///
    /// let control = LogicalControl::axis(0, false);
    /// assert_eq!(control.sample(&snap), 0.5);
    /// ```
    #[must_use]
    pub fn axis(index: u8, invert: bool) -> Self {
        Self {
            kind: ControlKind::Axis,
            index,
            component: 0,
            invert,
        }
    }

    /// Binds a button.
    #[must_use]
    pub fn button(index: u8, invert: bool) -> Self {
        Self {
            kind: ControlKind::Button,
            index,
            component: 0,
            invert,
        }
    }

    /// Binds one component of a directional pad.
    #[must_use]
    pub fn pad(index: u8, component: u8, invert: bool) -> Self {
        Self {
            kind: ControlKind::Pad,
            index,
            component,
            invert,
        }
    }

    /// Returns the control kind.
    #[must_use]
    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    /// Returns the primary device index of this control.
    #[must_use]
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Returns the pad sub-axis component.
    #[must_use]
    pub fn component(&self) -> u8 {
        self.component
    }

    /// Returns the sign applied to sampled values: -1.0 if inverted.
    #[must_use]
    pub fn sign(&self) -> f32 {
        if self.invert {
            -1.0
        } else {
            1.0
        }
    }

    /// Samples this control against the current pad snapshot.
    ///
    /// Pure read. A control bound past the snapshot's range samples as 0.0,
    /// so a misconfigured or absent input is neutral rather than an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tello_teleop::input::binding::{LogicalControl, PAD_Y};
    /// use tello_teleop::input::gamepad::PadSnapshot;
    ///
    /// let mut snap = PadSnapshot::default();
    /// snap.set_button(4, true);
    /// snap.set_hat(0, 0, 1);
    ///
    /// assert_eq!(LogicalControl::button(4, false).sample(&snap), 1.0);
    /// assert_eq!(LogicalControl::button(4, true).sample(&snap), -1.0);
    /// assert_eq!(LogicalControl::pad(0, PAD_Y, false).sample(&snap), 1.0);
    /// ```
    #[must_use]
    pub fn sample(&self, snapshot: &PadSnapshot) -> f32 {
        let raw = match self.kind {
            ControlKind::Axis => snapshot.axis(self.index),
            ControlKind::Button => {
                if snapshot.button(self.index) {
                    1.0
                } else {
                    0.0
                }
            }
            ControlKind::Pad => {
                let (x, y) = snapshot.hat(self.index);
                let value = if self.component == PAD_X { x } else { y };
                value as f32
            }
        };

        raw * self.sign()
    }

    /// Tests whether a pad motion event activates this binding.
    ///
    /// A motion matches when the selected component, after inversion, is
    /// strictly positive. Two bindings sharing a component but differing in
    /// sign are therefore mutually exclusive for any single motion.
    #[must_use]
    pub fn pad_motion_matches(&self, pad: u8, x: i8, y: i8) -> bool {
        if self.kind != ControlKind::Pad || self.index != pad {
            return false;
        }
        let value = if self.component == PAD_X { x } else { y };
        (value as f32) * self.sign() > 0.0
    }
}
