//! # Vehicle Link Module
//!
//! The contract the session uses to talk to the vehicle, and the Tello UDP
//! implementation.
//!
//! Setup calls (`connect`, `set_speed`, `stream_off`, `stream_on`) return
//! `bool`: `false` means the vehicle refused or timed out, and the session
//! aborts startup. Flight commands return `Result`; a failed send is logged
//! and superseded by the next cycle, never escalated.

pub mod tello;

use async_trait::async_trait;
use bytes::Bytes;

use crate::control::FlipDirection;
use crate::error::Result;

/// Live video feed handle, polled once per loop iteration.
pub trait FrameSource: Send {
    /// Latest frame data, if any has arrived yet.
    fn frame(&mut self) -> Option<Bytes>;

    /// Whether the feed has stopped. A stopped feed ends the session
    /// gracefully.
    fn stopped(&self) -> bool;
}

/// Commands understood by the vehicle.
#[async_trait]
pub trait VehicleLink: Send {
    /// Establishes the command channel. `false` aborts session startup.
    async fn connect(&mut self) -> bool;

    /// Sets the cruise speed in cm/s. `false` aborts session startup.
    async fn set_speed(&mut self, speed: i32) -> bool;

    /// Stops the video stream. Called during startup to clear a stream a
    /// previous unclean exit may have left running.
    async fn stream_off(&mut self) -> bool;

    /// Starts the video stream.
    async fn stream_on(&mut self) -> bool;

    /// Takes off.
    async fn takeoff(&mut self) -> Result<()>;

    /// Lands.
    async fn land(&mut self) -> Result<()>;

    /// Cuts motors immediately. Fire-and-forget: the vehicle may power
    /// down before acknowledging.
    async fn emergency_stop(&mut self) -> Result<()>;

    /// Performs a flip.
    async fn flip(&mut self, direction: FlipDirection) -> Result<()>;

    /// Sends the 4-axis velocity command. Fire-and-forget, no
    /// acknowledgment.
    async fn send_velocity(
        &mut self,
        lateral: i32,
        longitudinal: i32,
        vertical: i32,
        yaw: i32,
    ) -> Result<()>;

    /// Opens the video feed. Requires `stream_on` to have succeeded.
    async fn frame_source(&mut self) -> Result<Box<dyn FrameSource + Send>>;

    /// Releases link resources. Called exactly once at session end.
    async fn shutdown(&mut self) -> Result<()>;
}
