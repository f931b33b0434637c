//! # Keyboard Module
//!
//! Keyboard detection and reading via evdev.
//!
//! The keyboard is the primary input source and the only one guaranteed to
//! be present. The reader thread forwards press/release edges for the bound
//! key set only:
//!
//! | Key        | Action                      |
//! |------------|-----------------------------|
//! | Arrows     | forward / back / left / right |
//! | W / S      | ascend / descend            |
//! | A / D      | yaw counter-clockwise / clockwise |
//! | T          | takeoff                     |
//! | L          | land                        |
//! | Escape     | quit                        |
//!
//! Autorepeat events (evdev value 2) are dropped; holding a key must not
//! produce extra press edges.

use evdev::{Device, InputEvent as EvdevEvent, InputEventKind, Key as EvdevKey};
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::{InputEvent, Key};
use crate::error::{Result, TeleopError};

/// Maps an evdev key code to a bound key.
fn map_key(key: EvdevKey) -> Option<Key> {
    match key {
        EvdevKey::KEY_UP => Some(Key::ArrowUp),
        EvdevKey::KEY_DOWN => Some(Key::ArrowDown),
        EvdevKey::KEY_LEFT => Some(Key::ArrowLeft),
        EvdevKey::KEY_RIGHT => Some(Key::ArrowRight),
        EvdevKey::KEY_W => Some(Key::W),
        EvdevKey::KEY_S => Some(Key::S),
        EvdevKey::KEY_A => Some(Key::A),
        EvdevKey::KEY_D => Some(Key::D),
        EvdevKey::KEY_T => Some(Key::T),
        EvdevKey::KEY_L => Some(Key::L),
        EvdevKey::KEY_ESC => Some(Key::Escape),
        _ => None,
    }
}

/// Translates one raw evdev event into a keyboard [`InputEvent`].
///
/// Unbound keys, autorepeat, and non-key events produce nothing.
pub fn translate_event(event: &EvdevEvent) -> Option<InputEvent> {
    match event.kind() {
        InputEventKind::Key(code) => {
            if event.value() == 2 {
                return None;
            }
            map_key(code).map(|key| InputEvent::Key {
                key,
                pressed: event.value() != 0,
            })
        }
        _ => None,
    }
}

/// Handle to a detected keyboard device.
pub struct KeyboardReader {
    device: Device,
    device_path: String,
}

impl KeyboardReader {
    /// Scans `/dev/input` once for a keyboard.
    ///
    /// Returns `Ok(None)` when no keyboard is readable (the session can
    /// still run gamepad-only). Unopenable devices are skipped with a
    /// debug log.
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

        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            if let Some(filename) = path.file_name() {
                if !filename.to_string_lossy().starts_with("event") {
                    continue;
                }
            } else {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    if is_keyboard(&device) {
                        let device_path = path.to_string_lossy().to_string();
                        info!(
                            "Found keyboard {} at: {}",
                            device.name().unwrap_or("unknown"),
                            device_path
                        );
                        return Ok(Some(KeyboardReader {
                            device,
                            device_path,
                        }));
                    }
                }
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        warn!("No keyboard detected");
        Ok(None)
    }

    /// Get the device path of this keyboard
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Spawns the blocking reader thread.
    ///
    /// Runs until the device read fails or the receiving side is dropped.
    pub fn spawn(mut self, sender: UnboundedSender<InputEvent>) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || loop {
            let events = match self.device.fetch_events() {
                Ok(events) => events.collect::<Vec<_>>(),
                Err(e) => {
                    warn!("Keyboard read failed ({}), stopping reader", e);
                    break;
                }
            };

            for raw in events {
                if let Some(event) = translate_event(&raw) {
                    if sender.send(event).is_err() {
                        return;
                    }
                }
            }
        })
    }
}

/// A device counts as a keyboard when it has letter keys and Escape but is
/// not a gamepad.
fn is_keyboard(device: &Device) -> bool {
    device.supported_keys().map_or(false, |keys| {
        keys.contains(EvdevKey::KEY_ESC)
            && keys.contains(EvdevKey::KEY_W)
            && !keys.contains(EvdevKey::BTN_SOUTH)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    fn make_key_event(key: EvdevKey, value: i32) -> EvdevEvent {
        EvdevEvent::new(EventType::KEY, key.code(), value)
    }

    #[test]
    fn test_translate_bound_keys() {
        let cases = [
            (EvdevKey::KEY_UP, Key::ArrowUp),
            (EvdevKey::KEY_DOWN, Key::ArrowDown),
            (EvdevKey::KEY_LEFT, Key::ArrowLeft),
            (EvdevKey::KEY_RIGHT, Key::ArrowRight),
            (EvdevKey::KEY_W, Key::W),
            (EvdevKey::KEY_S, Key::S),
            (EvdevKey::KEY_A, Key::A),
            (EvdevKey::KEY_D, Key::D),
            (EvdevKey::KEY_T, Key::T),
            (EvdevKey::KEY_L, Key::L),
            (EvdevKey::KEY_ESC, Key::Escape),
        ];

        for (code, key) in cases {
            let press = make_key_event(code, 1);
            assert_eq!(
                translate_event(&press),
                Some(InputEvent::Key { key, pressed: true }),
                "press of {:?}",
                code
            );

            let release = make_key_event(code, 0);
            assert_eq!(
                translate_event(&release),
                Some(InputEvent::Key {
                    key,
                    pressed: false
                }),
                "release of {:?}",
                code
            );
        }
    }

    #[test]
    fn test_translate_unbound_key_dropped() {
        let event = make_key_event(EvdevKey::KEY_Q, 1);
        assert_eq!(translate_event(&event), None);
    }

    #[test]
    fn test_translate_autorepeat_dropped() {
        let event = make_key_event(EvdevKey::KEY_W, 2);
        assert_eq!(translate_event(&event), None);
    }

    #[test]
    fn test_translate_non_key_event_dropped() {
        let event = EvdevEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert_eq!(translate_event(&event), None);
    }

    #[test]
    fn test_detect_in_missing_directory() {
        let result = KeyboardReader::detect_in(Path::new("/nonexistent/input"));
        assert!(result.is_err());
    }
}
