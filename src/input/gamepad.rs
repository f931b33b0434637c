//! # Gamepad Module
//!
//! Gamepad detection, reading, and the pad snapshot sampled by the control
//! mapper.
//!
//! ## Detection
//!
//! The gamepad is optional. At startup the `/dev/input/event*` devices are
//! scanned once; the first device advertising both an `ABS_X` axis and a
//! `BTN_SOUTH` button is taken to be the gamepad. When none is found the
//! system runs in keyboard-only mode.
//!
//! ## Normalized numbering
//!
//! Raw evdev codes are translated to small contiguous indices so the binding
//! table in the configuration stays device-neutral:
//!
//! | evdev code | Index | | evdev code | Index |
//! |------------|-------|-|------------|-------|
//! | ABS_X      | 0     | | BTN_SOUTH  | 0     |
//! | ABS_Y      | 1     | | BTN_EAST   | 1     |
//! | ABS_Z      | 2     | | BTN_WEST   | 2     |
//! | ABS_RZ     | 3     | | BTN_NORTH  | 3     |
//! | ABS_RX     | 4     | | BTN_TL     | 4     |
//! | ABS_RY     | 5     | | BTN_TR     | 5     |
//!
//! Remaining buttons continue BTN_TL2 (6), BTN_TR2 (7), BTN_SELECT (8),
//! BTN_START (9), BTN_THUMBL (10), BTN_THUMBR (11), BTN_MODE (12),
//! BTN_TOUCH (13). The directional pad is `ABS_HAT0X`/`ABS_HAT0Y`, reported
//! as pad 0 with up and right positive.
//!
//! Axis values are normalized from the raw 0-255 range to [-1, 1] before
//! they leave the reader thread.

use evdev::{AbsoluteAxisType, Device, InputEvent as EvdevEvent, InputEventKind, Key as EvdevKey};
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::InputEvent;
use crate::error::{Result, TeleopError};

/// Raw axis value range reported by evdev gamepads.
pub const AXIS_RAW_MIN: i32 = 0;
/// Raw axis value range reported by evdev gamepads.
pub const AXIS_RAW_MAX: i32 = 255;
/// Raw axis center value.
pub const AXIS_RAW_CENTER: i32 = 128;

/// Number of normalized analog axes tracked per pad.
pub const MAX_AXES: u8 = 8;
/// Number of normalized buttons tracked per pad.
pub const MAX_BUTTONS: u8 = 16;
/// Number of directional pads tracked.
pub const MAX_HATS: u8 = 2;

/// Current state of every mapped gamepad input.
///
/// Updated synchronously by the session as pad events are drained, then
/// sampled by the control mapper once per tick. Axes hold normalized values
/// in [-1, 1]; hat components are -1, 0 or 1 with up and right positive.
///
/// # Examples
///
/// ```
/// use tello_teleop::input::gamepad::PadSnapshot;
///
/// let mut snap = PadSnapshot::default();
/// snap.set_axis(0, 0.5);
/// snap.set_button(4, true);
///
/// assert_eq!(snap.axis(0), 0.5);
/// assert!(snap.button(4));
/// assert_eq!(snap.hat(0), (0, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PadSnapshot {
    axes: [f32; MAX_AXES as usize],
    buttons: [bool; MAX_BUTTONS as usize],
    hats: [(i8, i8); MAX_HATS as usize],
}

impl PadSnapshot {
    /// Returns the normalized value of an axis, or 0.0 if out of range.
    #[must_use]
    pub fn axis(&self, index: u8) -> f32 {
        self.axes.get(index as usize).copied().unwrap_or(0.0)
    }

    /// Returns the pressed state of a button, or false if out of range.
    #[must_use]
    pub fn button(&self, index: u8) -> bool {
        self.buttons.get(index as usize).copied().unwrap_or(false)
    }

    /// Returns the (x, y) state of a directional pad, or (0, 0) if out of
    /// range.
    #[must_use]
    pub fn hat(&self, index: u8) -> (i8, i8) {
        self.hats.get(index as usize).copied().unwrap_or((0, 0))
    }

    /// Stores an axis value, clamped to [-1, 1]. Out-of-range indices are
    /// ignored.
    pub fn set_axis(&mut self, index: u8, value: f32) {
        if let Some(slot) = self.axes.get_mut(index as usize) {
            *slot = value.clamp(-1.0, 1.0);
        }
    }

    /// Stores a button state. Out-of-range indices are ignored.
    pub fn set_button(&mut self, index: u8, pressed: bool) {
        if let Some(slot) = self.buttons.get_mut(index as usize) {
            *slot = pressed;
        }
    }

    /// Stores a directional pad state. Out-of-range indices are ignored.
    pub fn set_hat(&mut self, index: u8, x: i8, y: i8) {
        if let Some(slot) = self.hats.get_mut(index as usize) {
            *slot = (x.clamp(-1, 1), y.clamp(-1, 1));
        }
    }

    /// Applies one pad event to the snapshot. Keyboard and quit events are
    /// ignored.
    pub fn apply(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::PadAxis { axis, value } => self.set_axis(axis, value),
            InputEvent::PadButton { button, pressed } => self.set_button(button, pressed),
            InputEvent::PadHat { pad, x, y } => self.set_hat(pad, x, y),
            InputEvent::Key { .. } | InputEvent::Quit => {}
        }
    }
}

/// Normalizes a raw evdev axis value (0-255) to [-1, 1].
#[must_use]
pub fn normalize_axis(raw: i32) -> f32 {
    let centered = (raw - AXIS_RAW_CENTER) as f32;
    (centered / (AXIS_RAW_CENTER - AXIS_RAW_MIN - 1) as f32).clamp(-1.0, 1.0)
}

/// Maps an evdev absolute axis code to a normalized axis index.
fn axis_index(axis: AbsoluteAxisType) -> Option<u8> {
    match axis {
        AbsoluteAxisType::ABS_X => Some(0),
        AbsoluteAxisType::ABS_Y => Some(1),
        AbsoluteAxisType::ABS_Z => Some(2),
        AbsoluteAxisType::ABS_RZ => Some(3),
        AbsoluteAxisType::ABS_RX => Some(4),
        AbsoluteAxisType::ABS_RY => Some(5),
        _ => None,
    }
}

/// Maps an evdev button code to a normalized button index.
fn button_index(key: EvdevKey) -> Option<u8> {
    match key {
        EvdevKey::BTN_SOUTH => Some(0),
        EvdevKey::BTN_EAST => Some(1),
        EvdevKey::BTN_WEST => Some(2),
        EvdevKey::BTN_NORTH => Some(3),
        EvdevKey::BTN_TL => Some(4),
        EvdevKey::BTN_TR => Some(5),
        EvdevKey::BTN_TL2 => Some(6),
        EvdevKey::BTN_TR2 => Some(7),
        EvdevKey::BTN_SELECT => Some(8),
        EvdevKey::BTN_START => Some(9),
        EvdevKey::BTN_THUMBL => Some(10),
        EvdevKey::BTN_THUMBR => Some(11),
        EvdevKey::BTN_MODE => Some(12),
        EvdevKey::BTN_TOUCH => Some(13),
        _ => None,
    }
}

/// Translates one raw evdev event into a normalized [`InputEvent`].
///
/// `hat` carries the reader's running directional-pad state, since evdev
/// reports X and Y motion as separate events but the session consumes whole
/// pad states. The Y component is negated so that up is positive.
///
/// Button autorepeat (value 2) produces no event: a held button must not
/// generate extra press edges.
pub fn translate_event(event: &EvdevEvent, hat: &mut (i8, i8)) -> Option<InputEvent> {
    match event.kind() {
        InputEventKind::AbsAxis(axis) => match axis {
            AbsoluteAxisType::ABS_HAT0X => {
                hat.0 = event.value().clamp(-1, 1) as i8;
                Some(InputEvent::PadHat {
                    pad: 0,
                    x: hat.0,
                    y: hat.1,
                })
            }
            AbsoluteAxisType::ABS_HAT0Y => {
                // evdev reports up as negative; flip so up is positive
                hat.1 = (-event.value().clamp(-1, 1)) as i8;
                Some(InputEvent::PadHat {
                    pad: 0,
                    x: hat.0,
                    y: hat.1,
                })
            }
            other => axis_index(other).map(|index| InputEvent::PadAxis {
                axis: index,
                value: normalize_axis(event.value()),
            }),
        },
        InputEventKind::Key(key) => {
            if event.value() == 2 {
                return None;
            }
            button_index(key).map(|index| InputEvent::PadButton {
                button: index,
                pressed: event.value() != 0,
            })
        }
        _ => None,
    }
}

/// Handle to a detected gamepad device.
pub struct GamepadReader {
    device: Device,
    device_path: String,
}

impl GamepadReader {
    /// Scans `/dev/input` once for a gamepad.
    ///
    /// Returns `Ok(None)` when no gamepad is present; that is a fully
    /// supported mode, not an error. Devices that cannot be opened (for
    /// example due to permissions) are skipped with a debug log.
    ///
    /// # Errors
    ///
    /// Returns `Device` error only if `/dev/input` itself cannot be read.
    pub fn detect() -> Result<Option<Self>> {
        Self::detect_in(Path::new("/dev/input"))
    }

    fn detect_in(input_dir: &Path) -> Result<Option<Self>> {
        if !input_dir.exists() {
            return Err(TeleopError::Device(format!(
                "{} directory not found",
                input_dir.display()
            )));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| TeleopError::Device(format!("Failed to read {}: {}", input_dir.display(), e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TeleopError::Device(format!("Failed to read directory entry: {}", e)))?;

        // Sort entries for deterministic device selection when multiple
        // gamepads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            // Only check event* devices
            if let Some(filename) = path.file_name() {
                if !filename.to_string_lossy().starts_with("event") {
                    continue;
                }
            } else {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    if is_gamepad(&device) {
                        let device_path = path.to_string_lossy().to_string();
                        info!(
                            "Found gamepad {} at: {}",
                            device.name().unwrap_or("unknown"),
                            device_path
                        );
                        return Ok(Some(GamepadReader {
                            device,
                            device_path,
                        }));
                    }
                    debug!("Skipping non-gamepad device: {}", path.display());
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        info!("No gamepad detected, running keyboard-only");
        Ok(None)
    }

    /// Get the device path of this gamepad
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Spawns the blocking reader thread.
    ///
    /// The thread translates raw events and pushes them onto `sender` until
    /// the device read fails (typically on disconnect) or the receiving side
    /// is dropped. Losing the gamepad mid-session does not end the session;
    /// the keyboard keeps working.
    pub fn spawn(mut self, sender: UnboundedSender<InputEvent>) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            let mut hat = (0i8, 0i8);
            loop {
                let events = match self.device.fetch_events() {
                    Ok(events) => events.collect::<Vec<_>>(),
                    Err(e) => {
                        warn!("Gamepad read failed ({}), stopping reader", e);
                        break;
                    }
                };

                for raw in events {
                    if let Some(event) = translate_event(&raw, &mut hat) {
                        if sender.send(event).is_err() {
                            return;
                        }
                    }
                }
            }
        })
    }
}

/// A device counts as a gamepad when it has an analog X axis and a south
/// face button.
fn is_gamepad(device: &Device) -> bool {
    let has_axis = device
        .supported_absolute_axes()
        .map_or(false, |axes| axes.contains(AbsoluteAxisType::ABS_X));
    let has_button = device
        .supported_keys()
        .map_or(false, |keys| keys.contains(EvdevKey::BTN_SOUTH));
    has_axis && has_button
}
