//! # Tello UDP Link
//!
//! Implements [`VehicleLink`] over the Tello text command protocol.
//!
//! Commands are ASCII datagrams to UDP port 8889 (`command`, `speed N`,
//! `streamon`, `streamoff`, `takeoff`, `land`, `flip f|b|l|r`, `emergency`,
//! `rc a b c d`). The vehicle answers most commands with `ok` or an error
//! string; `rc` and `emergency` are never acknowledged. Video arrives as a
//! raw datagram stream on a separate port once `streamon` is accepted.

use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{FrameSource, VehicleLink};
use crate::config::LinkConfig;
use crate::control::FlipDirection;
use crate::error::{Result, TeleopError};
use crate::video::UdpFrameSource;
use async_trait::async_trait;

/// Maximum expected size of a command response datagram.
const RESPONSE_BUF_SIZE: usize = 1024;

/// Command suffix for a flip direction.
fn flip_suffix(direction: FlipDirection) -> &'static str {
    match direction {
        FlipDirection::Forward => "f",
        FlipDirection::Back => "b",
        FlipDirection::Left => "l",
        FlipDirection::Right => "r",
    }
}

/// UDP link to a Tello-class vehicle.
pub struct TelloLink {
    socket: UdpSocket,
    video_port: u16,
    response_timeout: Duration,
}

impl std::fmt::Debug for TelloLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelloLink")
            .field("video_port", &self.video_port)
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}

impl TelloLink {
    /// Binds a local socket and points it at the vehicle.
    ///
    /// Uses an ephemeral local port; the vehicle replies to the sender
    /// address. No traffic is exchanged until [`VehicleLink::connect`].
    ///
    /// # Errors
    ///
    /// Returns `Link` error if the socket cannot be bound or the configured
    /// address does not resolve.
    pub async fn bind(config: &LinkConfig) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| TeleopError::Link(format!("Failed to bind command socket: {}", e)))?;

        let remote = format!("{}:{}", config.address, config.command_port);
        socket
            .connect(&remote)
            .await
            .map_err(|e| TeleopError::Link(format!("Failed to set peer {}: {}", remote, e)))?;

        info!("Command link ready for {}", remote);

        Ok(Self {
            socket,
            video_port: config.video_port,
            response_timeout: Duration::from_millis(config.response_timeout_ms),
        })
    }

    /// Sends a command and waits for the `ok` acknowledgment.
    ///
    /// Any error string, timeout, or socket failure counts as a refusal.
    async fn command_with_ok(&mut self, command: &str) -> bool {
        if let Err(e) = self.socket.send(command.as_bytes()).await {
            warn!("Failed to send '{}': {}", command, e);
            return false;
        }

        let mut buf = [0u8; RESPONSE_BUF_SIZE];
        match timeout(self.response_timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                let response = String::from_utf8_lossy(&buf[..len]);
                let response = response.trim();
                debug!("'{}' -> '{}'", command, response);
                if response.eq_ignore_ascii_case("ok") {
                    true
                } else {
                    warn!("Vehicle refused '{}': {}", command, response);
                    false
                }
            }
            Ok(Err(e)) => {
                warn!("Failed to read response to '{}': {}", command, e);
                false
            }
            Err(_) => {
                warn!("No response to '{}' within {:?}", command, self.response_timeout);
                false
            }
        }
    }

    /// Sends a command without waiting for any acknowledgment.
    async fn send_only(&mut self, command: &str) -> Result<()> {
        self.socket
            .send(command.as_bytes())
            .await
            .map_err(|e| TeleopError::Link(format!("Failed to send '{}': {}", command, e)))?;
        Ok(())
    }

    /// Sends an acknowledged flight command, mapping refusal to an error.
    async fn acked_command(&mut self, command: &str) -> Result<()> {
        if self.command_with_ok(command).await {
            Ok(())
        } else {
            Err(TeleopError::Link(format!(
                "Vehicle did not acknowledge '{}'",
                command
            )))
        }
    }
}

#[async_trait]
impl VehicleLink for TelloLink {
    async fn connect(&mut self) -> bool {
        // Enter SDK mode
        self.command_with_ok("command").await
    }

    async fn set_speed(&mut self, speed: i32) -> bool {
        self.command_with_ok(&format!("speed {}", speed)).await
    }

    async fn stream_off(&mut self) -> bool {
        self.command_with_ok("streamoff").await
    }

    async fn stream_on(&mut self) -> bool {
        self.command_with_ok("streamon").await
    }

    async fn takeoff(&mut self) -> Result<()> {
        self.acked_command("takeoff").await
    }

    async fn land(&mut self) -> Result<()> {
        self.acked_command("land").await
    }

    async fn emergency_stop(&mut self) -> Result<()> {
        // The vehicle cuts motors without replying
        self.send_only("emergency").await
    }

    async fn flip(&mut self, direction: FlipDirection) -> Result<()> {
        self.acked_command(&format!("flip {}", flip_suffix(direction)))
            .await
    }

    async fn send_velocity(
        &mut self,
        lateral: i32,
        longitudinal: i32,
        vertical: i32,
        yaw: i32,
    ) -> Result<()> {
        self.send_only(&format!(
            "rc {} {} {} {}",
            lateral, longitudinal, vertical, yaw
        ))
        .await
    }

    async fn frame_source(&mut self) -> Result<Box<dyn FrameSource + Send>> {
        let source = UdpFrameSource::bind(self.video_port).await?;
        Ok(Box::new(source))
    }

    async fn shutdown(&mut self) -> Result<()> {
        // Best effort: the vehicle may already be gone
        if !self.command_with_ok("streamoff").await {
            debug!("streamoff not acknowledged during shutdown");
        }
        info!("Vehicle link closed");
        Ok(())
    }
}
