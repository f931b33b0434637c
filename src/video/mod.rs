//! # Video Module
//!
//! Receives the vehicle's video datagrams and hands the latest frame to a
//! display once per render pass.
//!
//! The feed is lossy by design: a background task overwrites a single slot
//! with each arriving datagram, and the render pass takes whatever is there.
//! Frames that arrive between render passes are dropped, never queued, so
//! the operator always sees the freshest picture the network delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::error::{Result, TeleopError};
use crate::link::FrameSource;

/// Maximum size of a single video datagram.
const VIDEO_BUF_SIZE: usize = 2048;

/// Receives video datagrams into a single latest-frame slot.
///
/// Dropping the source aborts the receive task and closes the socket.
pub struct UdpFrameSource {
    latest: Arc<Mutex<Option<Bytes>>>,
    stopped: Arc<AtomicBool>,
    local_port: u16,
    task: tokio::task::JoinHandle<()>,
}

impl UdpFrameSource {
    /// Binds the video port and starts receiving in the background.
    ///
    /// # Errors
    ///
    /// Returns `Link` error if the port cannot be bound.
    pub async fn bind(port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .await
            .map_err(|e| TeleopError::Link(format!("Failed to bind video port {}: {}", port, e)))?;

        let local_port = socket
            .local_addr()
            .map_err(|e| TeleopError::Link(format!("Failed to read video socket address: {}", e)))?
            .port();

        info!("Video feed listening on port {}", local_port);

        let latest = Arc::new(Mutex::new(None));
        let stopped = Arc::new(AtomicBool::new(false));

        let slot = Arc::clone(&latest);
        let stop_flag = Arc::clone(&stopped);
        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; VIDEO_BUF_SIZE];
            loop {
                match socket.recv(&mut buf).await {
                    Ok(0) => {
                        debug!("Video feed closed");
                        break;
                    }
                    Ok(len) => {
                        let frame = Bytes::copy_from_slice(&buf[..len]);
                        if let Ok(mut slot) = slot.lock() {
                            *slot = Some(frame);
                        }
                    }
                    Err(e) => {
                        warn!("Video receive failed: {}", e);
                        break;
                    }
                }
            }
            stop_flag.store(true, Ordering::SeqCst);
        });

        Ok(Self {
            latest,
            stopped,
            local_port,
            task,
        })
    }

    /// The actually bound port. Differs from the requested port only when
    /// the request was 0.
    #[must_use]
    pub fn local_port(&self) -> u16 {
        self.local_port
    }
}

impl FrameSource for UdpFrameSource {
    fn frame(&mut self) -> Option<Bytes> {
        match self.latest.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        }
    }

    fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for UdpFrameSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Sink for the render pass. One frame per pass, at the render cadence.
pub trait Display {
    /// Presents a frame to the operator.
    fn present(&mut self, frame: &Bytes);
}

/// Headless display: counts frames and logs feed statistics periodically.
///
/// Stands in for a windowed renderer on machines without one. The session
/// drives it at the render cadence like any other display.
#[derive(Debug, Default)]
pub struct StatsDisplay {
    frames: u64,
    bytes: u64,
    last_report: u64,
}

/// Frames between statistics log lines.
const REPORT_INTERVAL: u64 = 250;

impl StatsDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total frames presented so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Display for StatsDisplay {
    fn present(&mut self, frame: &Bytes) {
        self.frames += 1;
        self.bytes += frame.len() as u64;

        if self.frames - self.last_report >= REPORT_INTERVAL {
            info!(
                "Video feed: {} frames, {} bytes received",
                self.frames, self.bytes
            );
            self.last_report = self.frames;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for_frame(source: &mut UdpFrameSource) -> Option<Bytes> {
        for _ in 0..50 {
            if let Some(frame) = source.frame() {
                return Some(frame);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_no_frame_before_any_datagram() {
        let mut source = UdpFrameSource::bind(0).await.unwrap();
        assert_eq!(source.frame(), None);
        assert!(!source.stopped());
    }

    #[tokio::test]
    async fn test_latest_datagram_becomes_frame() {
        let mut source = UdpFrameSource::bind(0).await.unwrap();
        let port = source.local_port();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        sender
            .send_to(b"frame-one", ("127.0.0.1", port))
            .await
            .unwrap();

        let frame = wait_for_frame(&mut source).await;
        assert_eq!(frame, Some(Bytes::from_static(b"frame-one")));
    }

    #[tokio::test]
    async fn test_newer_datagram_overwrites_older() {
        let mut source = UdpFrameSource::bind(0).await.unwrap();
        let port = source.local_port();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        sender.send_to(b"old", ("127.0.0.1", port)).await.unwrap();
        wait_for_frame(&mut source).await;

        sender.send_to(b"new", ("127.0.0.1", port)).await.unwrap();
        for _ in 0..50 {
            if source.frame() == Some(Bytes::from_static(b"new")) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("newer frame never replaced the older one");
    }

    #[test]
    fn test_stats_display_counts_frames() {
        let mut display = StatsDisplay::new();
        let frame = Bytes::from_static(b"abc");

        display.present(&frame);
        display.present(&frame);
        assert_eq!(display.frames(), 2);
    }
}
