//! # Tello Teleop Library
//!
//! Pilot a Tello drone from keyboard or gamepad with a live video feed.
//!
//! This library provides the core functionality for translating raw input
//! device samples into bounded 4-axis velocity commands and discrete one-shot
//! commands (takeoff, land, flip, emergency stop) for a Tello-class drone.

pub mod config;
pub mod control;
pub mod error;
pub mod input;
pub mod link;
pub mod session;
pub mod telemetry;
pub mod video;
