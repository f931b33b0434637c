//! # Gamepad Control Mapper
//!
//! Maps sampled gamepad controls to the four velocity axes and turns
//! button/pad edges into one-shot commands.
//!
//! ## Velocity mapping
//!
//! Once per tick, while a gamepad is present, the mapper recomputes all four
//! axes from the current snapshot. The dedicated speed axis sets the
//! magnitude: its native [-1, 1] value is remapped to a [0, 100] scale, and
//! each directional sample is multiplied by that scale and rounded:
//!
//! ```text
//! scale    = (speed_sample + 1) / 2 * 100
//! velocity = round(scale * axis_sample)
//! ```
//!
//! The result always lies within [-100, 100]. The mapping is a full
//! overwrite: nothing accumulates across ticks, so there is no drift, and
//! any value a keyboard press wrote earlier in the tick is replaced.
//!
//! ## Edges
//!
//! Edge handling is separate from the per-tick mapping. A press of the
//! takeoff or emergency button and a release of the land button produce a
//! [`Command`] and flip the armed flag. A directional-pad motion is checked
//! against the four flip bindings in fixed priority order (forward, back,
//! right, left); the first match wins and at most one flip fires per edge.

use tracing::debug;

use super::state::ControlState;
use super::{Command, FlipDirection};
use crate::config::GamepadConfig;
use crate::input::binding::{LogicalControl, PAD_X, PAD_Y};
use crate::input::gamepad::PadSnapshot;

/// Maximum speed scale, matching the velocity bound.
pub const SPEED_SCALE_MAX: f32 = 100.0;

/// Source of the vertical velocity axis, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalSource {
    /// Signed sum of an "up" button and an inverted "down" button.
    Buttons {
        up: LogicalControl,
        down: LogicalControl,
    },
    /// A directional-pad component.
    Pad(LogicalControl),
}

/// The full gamepad binding table. Built once from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadBindings {
    pub lateral: LogicalControl,
    pub longitudinal: LogicalControl,
    pub yaw: LogicalControl,
    /// Speed scale axis, re-read every tick.
    pub speed: LogicalControl,
    pub vertical: VerticalSource,
    pub takeoff_button: u8,
    pub land_button: u8,
    pub emergency_button: u8,
    /// Flip bindings in priority order: forward, back, right, left.
    pub flips: [(LogicalControl, FlipDirection); 4],
}

impl GamepadBindings {
    /// Builds the binding table from configuration.
    #[must_use]
    pub fn from_config(config: &GamepadConfig) -> Self {
        let vertical = if config.vertical_mode == "hat" {
            VerticalSource::Pad(LogicalControl::pad(0, PAD_Y, false))
        } else {
            VerticalSource::Buttons {
                up: LogicalControl::button(config.up_button, false),
                // Inverted so a press contributes -1: descend
                down: LogicalControl::button(config.down_button, true),
            }
        };

        Self {
            lateral: LogicalControl::axis(config.lateral_axis, false),
            longitudinal: LogicalControl::axis(
                config.longitudinal_axis,
                config.longitudinal_invert,
            ),
            yaw: LogicalControl::axis(config.yaw_axis, false),
            speed: LogicalControl::axis(config.speed_axis, config.speed_invert),
            vertical,
            takeoff_button: config.takeoff_button,
            land_button: config.land_button,
            emergency_button: config.emergency_button,
            flips: [
                (LogicalControl::pad(0, PAD_Y, false), FlipDirection::Forward),
                (LogicalControl::pad(0, PAD_Y, true), FlipDirection::Back),
                (LogicalControl::pad(0, PAD_X, false), FlipDirection::Right),
                (LogicalControl::pad(0, PAD_X, true), FlipDirection::Left),
            ],
        }
    }
}

impl Default for GamepadBindings {
    /// Stock binding table.
    fn default() -> Self {
        Self::from_config(&GamepadConfig::default())
    }
}

/// Translates gamepad samples and edges into control-state updates and
/// one-shot commands.
///
/// # Examples
///
/// ```
/// use tello_teleop::control::mapper::GamepadMapper;
/// use tello_teleop::control::state::ControlState;
/// use tello_teleop::input::gamepad::PadSnapshot;
///
/// let mapper = GamepadMapper::default();
/// let mut snap = PadSnapshot::default();
/// snap.set_axis(2, -1.0); // speed axis is inverted: full scale
/// snap.set_axis(0, 0.5);
///
/// let mut state = ControlState::new();
/// mapper.apply(&snap, &mut state);
/// assert_eq!(state.lateral(), 50);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GamepadMapper {
    bindings: GamepadBindings,
}

impl GamepadMapper {
    /// Creates a mapper over the given binding table.
    #[must_use]
    pub fn new(bindings: GamepadBindings) -> Self {
        Self { bindings }
    }

    /// Current speed scale in [0, 100], derived from the speed axis.
    #[must_use]
    pub fn speed_scale(&self, snapshot: &PadSnapshot) -> f32 {
        (self.bindings.speed.sample(snapshot) + 1.0) / 2.0 * SPEED_SCALE_MAX
    }

    /// Recomputes all four velocity axes from the current snapshot.
    ///
    /// Full overwrite: every axis is written, including to zero when its
    /// control is centered.
    pub fn apply(&self, snapshot: &PadSnapshot, state: &mut ControlState) {
        let scale = self.speed_scale(snapshot);

        state.set_lateral(Self::to_velocity(scale, self.bindings.lateral.sample(snapshot)));
        state.set_longitudinal(Self::to_velocity(
            scale,
            self.bindings.longitudinal.sample(snapshot),
        ));
        state.set_yaw(Self::to_velocity(scale, self.bindings.yaw.sample(snapshot)));

        let vertical_sample = match self.bindings.vertical {
            VerticalSource::Buttons { up, down } => up.sample(snapshot) + down.sample(snapshot),
            VerticalSource::Pad(control) => control.sample(snapshot),
        };
        state.set_vertical(Self::to_velocity(scale, vertical_sample));
    }

    /// Rounds a scaled sample to an integer velocity.
    #[inline]
    fn to_velocity(scale: f32, sample: f32) -> i32 {
        (scale * sample).round() as i32
    }

    /// Handles a button press edge.
    ///
    /// The takeoff button arms; the emergency button disarms. Returns the
    /// command to dispatch, if any.
    pub fn button_down(&self, button: u8, state: &mut ControlState) -> Option<Command> {
        if button == self.bindings.takeoff_button {
            state.arm();
            Some(Command::Takeoff)
        } else if button == self.bindings.emergency_button {
            state.disarm();
            Some(Command::EmergencyStop)
        } else {
            None
        }
    }

    /// Handles a button release edge. The land button disarms.
    pub fn button_up(&self, button: u8, state: &mut ControlState) -> Option<Command> {
        if button == self.bindings.land_button {
            state.disarm();
            Some(Command::Land)
        } else {
            None
        }
    }

    /// Handles a directional-pad motion edge.
    ///
    /// Checks the flip bindings in priority order; the first match wins, so
    /// at most one flip fires per motion.
    pub fn pad_motion(&self, pad: u8, x: i8, y: i8) -> Option<Command> {
        for (control, direction) in &self.bindings.flips {
            if control.pad_motion_matches(pad, x, y) {
                debug!("Pad motion ({}, {}) triggers flip {:?}", x, y, direction);
                return Some(Command::Flip(*direction));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_mapper() -> GamepadMapper {
        GamepadMapper::default()
    }

    /// Snapshot with the inverted stock speed axis pushed to full scale.
    fn full_scale_snapshot() -> PadSnapshot {
        let mut snap = PadSnapshot::default();
        snap.set_axis(2, -1.0);
        snap
    }

    // ==================== Speed Scale Tests ====================

    #[test]
    fn test_speed_scale_full() {
        let mapper = stock_mapper();
        let snap = full_scale_snapshot();
        assert_eq!(mapper.speed_scale(&snap), 100.0);
    }

    #[test]
    fn test_speed_scale_zero() {
        let mapper = stock_mapper();
        let mut snap = PadSnapshot::default();
        snap.set_axis(2, 1.0); // inverted: samples as -1
        assert_eq!(mapper.speed_scale(&snap), 0.0);
    }

    #[test]
    fn test_speed_scale_center() {
        let mapper = stock_mapper();
        let snap = PadSnapshot::default();
        assert_eq!(mapper.speed_scale(&snap), 50.0);
    }

    // ==================== Velocity Mapping Tests ====================

    #[test]
    fn test_full_scale_half_deflection_maps_to_50() {
        // speed sample 1.0 -> scale 100; lateral sample 0.5 -> velocity 50
        let mapper = stock_mapper();
        let mut snap = full_scale_snapshot();
        snap.set_axis(0, 0.5);

        let mut state = ControlState::new();
        mapper.apply(&snap, &mut state);
        assert_eq!(state.lateral(), 50);
    }

    #[test]
    fn test_mapped_velocity_rounds() {
        let mapper = stock_mapper();
        let mut snap = full_scale_snapshot();
        snap.set_axis(0, 0.333);

        let mut state = ControlState::new();
        mapper.apply(&snap, &mut state);
        assert_eq!(state.lateral(), 33);

        snap.set_axis(0, 0.335);
        mapper.apply(&snap, &mut state);
        assert_eq!(state.lateral(), 34);
    }

    #[test]
    fn test_mapped_velocity_stays_within_bounds() {
        let mapper = stock_mapper();
        let mut snap = full_scale_snapshot();

        for sample in [-1.0f32, -0.7, -0.1, 0.0, 0.4, 1.0] {
            snap.set_axis(0, sample);
            snap.set_axis(3, -sample);

            let mut state = ControlState::new();
            mapper.apply(&snap, &mut state);
            assert!(state.lateral().abs() <= 100, "sample {}", sample);
            assert!(state.yaw().abs() <= 100, "sample {}", sample);
        }
    }

    #[test]
    fn test_longitudinal_axis_is_inverted() {
        // Pushing the stick forward reports a negative raw value; the stock
        // binding inverts it into positive (forward) velocity
        let mapper = stock_mapper();
        let mut snap = full_scale_snapshot();
        snap.set_axis(1, -1.0);

        let mut state = ControlState::new();
        mapper.apply(&snap, &mut state);
        assert_eq!(state.longitudinal(), 100);
    }

    #[test]
    fn test_apply_overwrites_previous_values() {
        let mapper = stock_mapper();
        let snap = full_scale_snapshot(); // all directional axes centered

        let mut state = ControlState::new();
        state.set_lateral(60);
        state.set_longitudinal(-60);
        state.set_vertical(60);
        state.set_yaw(-60);

        mapper.apply(&snap, &mut state);
        assert_eq!(state.velocity(), (0, 0, 0, 0));
    }

    #[test]
    fn test_apply_does_not_accumulate_across_ticks() {
        let mapper = stock_mapper();
        let mut snap = full_scale_snapshot();
        snap.set_axis(0, 0.3);

        let mut state = ControlState::new();
        mapper.apply(&snap, &mut state);
        mapper.apply(&snap, &mut state);
        mapper.apply(&snap, &mut state);
        assert_eq!(state.lateral(), 30);
    }

    #[test]
    fn test_apply_leaves_armed_flag_alone() {
        let mapper = stock_mapper();
        let snap = full_scale_snapshot();

        let mut state = ControlState::new();
        state.arm();
        mapper.apply(&snap, &mut state);
        assert!(state.is_armed());
    }

    // ==================== Vertical Source Tests ====================

    #[test]
    fn test_vertical_up_button() {
        let mapper = stock_mapper();
        let mut snap = full_scale_snapshot();
        snap.set_button(4, true); // stock up button

        let mut state = ControlState::new();
        mapper.apply(&snap, &mut state);
        assert_eq!(state.vertical(), 100);
    }

    #[test]
    fn test_vertical_down_button() {
        let mapper = stock_mapper();
        let mut snap = full_scale_snapshot();
        snap.set_button(2, true); // stock down button

        let mut state = ControlState::new();
        mapper.apply(&snap, &mut state);
        assert_eq!(state.vertical(), -100);
    }

    #[test]
    fn test_vertical_both_buttons_cancel() {
        let mapper = stock_mapper();
        let mut snap = full_scale_snapshot();
        snap.set_button(4, true);
        snap.set_button(2, true);

        let mut state = ControlState::new();
        mapper.apply(&snap, &mut state);
        assert_eq!(state.vertical(), 0);
    }

    #[test]
    fn test_vertical_buttons_scale_with_speed() {
        let mapper = stock_mapper();
        let mut snap = PadSnapshot::default(); // center speed: scale 50
        snap.set_button(4, true);

        let mut state = ControlState::new();
        mapper.apply(&snap, &mut state);
        assert_eq!(state.vertical(), 50);
    }

    #[test]
    fn test_vertical_hat_mode() {
        let mut config = GamepadConfig::default();
        config.vertical_mode = "hat".to_string();
        let mapper = GamepadMapper::new(GamepadBindings::from_config(&config));

        let mut snap = full_scale_snapshot();
        snap.set_hat(0, 0, 1);

        let mut state = ControlState::new();
        mapper.apply(&snap, &mut state);
        assert_eq!(state.vertical(), 100);

        snap.set_hat(0, 0, -1);
        mapper.apply(&snap, &mut state);
        assert_eq!(state.vertical(), -100);
    }

    // ==================== Button Edge Tests ====================

    #[test]
    fn test_takeoff_button_arms_and_commands() {
        let mapper = stock_mapper();
        let mut state = ControlState::new();

        let command = mapper.button_down(11, &mut state);
        assert_eq!(command, Some(Command::Takeoff));
        assert!(state.is_armed());
    }

    #[test]
    fn test_emergency_button_disarms_and_commands() {
        let mapper = stock_mapper();
        let mut state = ControlState::new();
        state.arm();

        let command = mapper.button_down(3, &mut state);
        assert_eq!(command, Some(Command::EmergencyStop));
        assert!(!state.is_armed());
    }

    #[test]
    fn test_land_fires_on_release_only() {
        let mapper = stock_mapper();
        let mut state = ControlState::new();
        state.arm();

        // Pressing the land button does nothing
        assert_eq!(mapper.button_down(10, &mut state), None);
        assert!(state.is_armed());

        // Releasing it lands and disarms
        assert_eq!(mapper.button_up(10, &mut state), Some(Command::Land));
        assert!(!state.is_armed());
    }

    #[test]
    fn test_unbound_button_edges_ignored() {
        let mapper = stock_mapper();
        let mut state = ControlState::new();

        assert_eq!(mapper.button_down(7, &mut state), None);
        assert_eq!(mapper.button_up(7, &mut state), None);
        assert!(!state.is_armed());
    }

    #[test]
    fn test_takeoff_release_does_not_land() {
        let mapper = stock_mapper();
        let mut state = ControlState::new();

        mapper.button_down(11, &mut state);
        assert_eq!(mapper.button_up(11, &mut state), None);
        assert!(state.is_armed());
    }

    // ==================== Flip Priority Tests ====================

    #[test]
    fn test_flip_cardinal_directions() {
        let mapper = stock_mapper();
        assert_eq!(
            mapper.pad_motion(0, 0, 1),
            Some(Command::Flip(FlipDirection::Forward))
        );
        assert_eq!(
            mapper.pad_motion(0, 0, -1),
            Some(Command::Flip(FlipDirection::Back))
        );
        assert_eq!(
            mapper.pad_motion(0, 1, 0),
            Some(Command::Flip(FlipDirection::Right))
        );
        assert_eq!(
            mapper.pad_motion(0, -1, 0),
            Some(Command::Flip(FlipDirection::Left))
        );
    }

    #[test]
    fn test_flip_diagonal_forward_wins() {
        // Forward outranks right on a diagonal motion
        let mapper = stock_mapper();
        assert_eq!(
            mapper.pad_motion(0, 1, 1),
            Some(Command::Flip(FlipDirection::Forward))
        );
    }

    #[test]
    fn test_flip_diagonal_back_wins_over_left() {
        let mapper = stock_mapper();
        assert_eq!(
            mapper.pad_motion(0, -1, -1),
            Some(Command::Flip(FlipDirection::Back))
        );
    }

    #[test]
    fn test_flip_priority_order_is_forward_back_right_left() {
        let mapper = stock_mapper();
        let order: Vec<FlipDirection> =
            mapper.bindings.flips.iter().map(|(_, d)| *d).collect();
        assert_eq!(
            order,
            vec![
                FlipDirection::Forward,
                FlipDirection::Back,
                FlipDirection::Right,
                FlipDirection::Left,
            ]
        );
    }

    #[test]
    fn test_flip_single_command_per_edge() {
        // Even a fully diagonal motion yields exactly one flip
        let mapper = stock_mapper();
        for (x, y) in [(1i8, 1i8), (1, -1), (-1, 1), (-1, -1)] {
            assert!(mapper.pad_motion(0, x, y).is_some());
        }
    }

    #[test]
    fn test_pad_release_triggers_no_flip() {
        let mapper = stock_mapper();
        assert_eq!(mapper.pad_motion(0, 0, 0), None);
    }

    #[test]
    fn test_other_pad_triggers_no_flip() {
        let mapper = stock_mapper();
        assert_eq!(mapper.pad_motion(1, 1, 1), None);
    }

    // ==================== Binding Table Tests ====================

    #[test]
    fn test_default_bindings_match_stock_config() {
        let bindings = GamepadBindings::default();
        assert_eq!(bindings.takeoff_button, 11);
        assert_eq!(bindings.land_button, 10);
        assert_eq!(bindings.emergency_button, 3);
        assert!(matches!(bindings.vertical, VerticalSource::Buttons { .. }));
    }

    #[test]
    fn test_from_config_hat_vertical() {
        let mut config = GamepadConfig::default();
        config.vertical_mode = "hat".to_string();
        let bindings = GamepadBindings::from_config(&config);
        assert!(matches!(bindings.vertical, VerticalSource::Pad(_)));
    }
}
