//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Defaults reproduce the stock control layout: keyboard speed 60, command
//! tick at 20Hz, render pass at 25Hz, sticks on axes 0/1/3 with the speed
//! scale on axis 2, and takeoff/land/emergency on buttons 11/10/3.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub link: LinkConfig,
    pub control: ControlConfig,
    pub timing: TimingConfig,
    pub gamepad: GamepadConfig,
    pub telemetry: TelemetryConfig,
}

/// Vehicle link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_command_port")]
    pub command_port: u16,

    #[serde(default = "default_video_port")]
    pub video_port: u16,

    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

/// Control constants
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    /// Velocity magnitude set by a key press (the `S` constant).
    #[serde(default = "default_keyboard_speed")]
    pub keyboard_speed: i32,

    /// Cruise speed sent to the vehicle during session startup.
    #[serde(default = "default_initial_speed")]
    pub initial_speed: i32,
}

/// Loop timing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    /// Velocity command dispatch rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Render pass rate (independent of the command tick).
    #[serde(default = "default_render_hz")]
    pub render_hz: u32,
}

/// Gamepad binding configuration
///
/// Indices refer to the normalized axis/button numbering produced by the
/// gamepad reader, not raw evdev codes.
#[derive(Debug, Deserialize, Clone)]
pub struct GamepadConfig {
    #[serde(default = "default_lateral_axis")]
    pub lateral_axis: u8,

    #[serde(default = "default_longitudinal_axis")]
    pub longitudinal_axis: u8,

    #[serde(default = "default_longitudinal_invert")]
    pub longitudinal_invert: bool,

    #[serde(default = "default_yaw_axis")]
    pub yaw_axis: u8,

    #[serde(default = "default_speed_axis")]
    pub speed_axis: u8,

    #[serde(default = "default_speed_invert")]
    pub speed_invert: bool,

    /// Vertical velocity source: "buttons" (up/down button pair) or "hat".
    #[serde(default = "default_vertical_mode")]
    pub vertical_mode: String,

    #[serde(default = "default_up_button")]
    pub up_button: u8,

    #[serde(default = "default_down_button")]
    pub down_button: u8,

    #[serde(default = "default_takeoff_button")]
    pub takeoff_button: u8,

    #[serde(default = "default_land_button")]
    pub land_button: u8,

    #[serde(default = "default_emergency_button")]
    pub emergency_button: u8,
}

/// Flight log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_address() -> String { "192.168.10.1".to_string() }
fn default_command_port() -> u16 { 8889 }
fn default_video_port() -> u16 { 11111 }
fn default_response_timeout_ms() -> u64 { 7000 }

fn default_keyboard_speed() -> i32 { 60 }
fn default_initial_speed() -> i32 { 10 }

fn default_tick_hz() -> u32 { 20 }
fn default_render_hz() -> u32 { 25 }

fn default_lateral_axis() -> u8 { 0 }
fn default_longitudinal_axis() -> u8 { 1 }
fn default_longitudinal_invert() -> bool { true }
fn default_yaw_axis() -> u8 { 3 }
fn default_speed_axis() -> u8 { 2 }
fn default_speed_invert() -> bool { true }
fn default_vertical_mode() -> String { "buttons".to_string() }
fn default_up_button() -> u8 { 4 }
fn default_down_button() -> u8 { 2 }
fn default_takeoff_button() -> u8 { 11 }
fn default_land_button() -> u8 { 10 }
fn default_emergency_button() -> u8 { 3 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            command_port: default_command_port(),
            video_port: default_video_port(),
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            keyboard_speed: default_keyboard_speed(),
            initial_speed: default_initial_speed(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            render_hz: default_render_hz(),
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            lateral_axis: default_lateral_axis(),
            longitudinal_axis: default_longitudinal_axis(),
            longitudinal_invert: default_longitudinal_invert(),
            yaw_axis: default_yaw_axis(),
            speed_axis: default_speed_axis(),
            speed_invert: default_speed_invert(),
            vertical_mode: default_vertical_mode(),
            up_button: default_up_button(),
            down_button: default_down_button(),
            takeoff_button: default_takeoff_button(),
            land_button: default_land_button(),
            emergency_button: default_emergency_button(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tello_teleop::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults if absent
    ///
    /// A missing file is not an error: the stock bindings are usable without
    /// any configuration. Parse and validation failures still abort.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            warn!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.link.address.is_empty() {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("link address cannot be empty"),
            ));
        }

        if self.link.command_port == 0 || self.link.video_port == 0 {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("link ports must be non-zero"),
            ));
        }

        if self.link.response_timeout_ms == 0 || self.link.response_timeout_ms > 60000 {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("response_timeout_ms must be between 1 and 60000"),
            ));
        }

        // Velocities are bounded to +/-100; a key press must stay inside that
        if self.control.keyboard_speed < 1 || self.control.keyboard_speed > 100 {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("keyboard_speed must be between 1 and 100"),
            ));
        }

        // The vehicle accepts cruise speeds of 10-100 cm/s
        if self.control.initial_speed < 10 || self.control.initial_speed > 100 {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("initial_speed must be between 10 and 100"),
            ));
        }

        if self.timing.tick_hz == 0 || self.timing.tick_hz > 50 {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("tick_hz must be between 1 and 50"),
            ));
        }

        if self.timing.render_hz == 0 || self.timing.render_hz > 60 {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("render_hz must be between 1 and 60"),
            ));
        }

        for (name, axis) in [
            ("lateral_axis", self.gamepad.lateral_axis),
            ("longitudinal_axis", self.gamepad.longitudinal_axis),
            ("yaw_axis", self.gamepad.yaw_axis),
            ("speed_axis", self.gamepad.speed_axis),
        ] {
            if axis >= crate::input::gamepad::MAX_AXES {
                return Err(crate::error::TeleopError::Config(toml::de::Error::custom(
                    format!("{} must be below {}", name, crate::input::gamepad::MAX_AXES),
                )));
            }
        }

        for (name, button) in [
            ("up_button", self.gamepad.up_button),
            ("down_button", self.gamepad.down_button),
            ("takeoff_button", self.gamepad.takeoff_button),
            ("land_button", self.gamepad.land_button),
            ("emergency_button", self.gamepad.emergency_button),
        ] {
            if button >= crate::input::gamepad::MAX_BUTTONS {
                return Err(crate::error::TeleopError::Config(toml::de::Error::custom(
                    format!(
                        "{} must be below {}",
                        name,
                        crate::input::gamepad::MAX_BUTTONS
                    ),
                )));
            }
        }

        if self.gamepad.vertical_mode != "buttons" && self.gamepad.vertical_mode != "hat" {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("vertical_mode must be 'buttons' or 'hat'"),
            ));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("telemetry log_dir cannot be empty when enabled"),
            ));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0"),
            ));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(crate::error::TeleopError::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0"),
            ));
        }

        Ok(())
    }
}
