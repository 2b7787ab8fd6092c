//! Capture transport seam
//!
//! [`CaptureBackend`] enumerates interfaces and opens handles; a
//! [`CaptureHandle`] is opened, used and closed by exactly one worker thread,
//! so it carries no `Send` bound. The pcap implementation lives in
//! [`crate::capture`].

use crate::filters::CaptureFilter;
use crate::stats::HandleStats;
use chrono::{DateTime, Utc};
use snoop_core::{CaptureConfig, InterfaceInfo, Result, Settings};
use snoop_packet::LinkType;
use std::time::Duration;

/// Parameters used when opening a capture handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    pub promiscuous: bool,
    /// Maximum bytes captured per frame
    pub snaplen: i32,
    /// Upper bound on how long a read blocks without traffic
    pub poll_interval: Duration,
    pub immediate_mode: bool,
    /// Kernel buffer size in bytes (0 = platform default)
    pub buffer_size: i32,
}

impl OpenOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let capture: &CaptureConfig = &settings.capture;
        Self {
            promiscuous: settings.promiscuous,
            snaplen: capture.snaplen,
            poll_interval: capture.poll_interval(),
            immediate_mode: capture.immediate_mode,
            buffer_size: capture.buffer_size,
        }
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// One frame as read from a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub timestamp: DateTime<Utc>,
    /// Captured bytes, at most snaplen long
    pub data: Vec<u8>,
    /// Original length on the wire
    pub wire_len: usize,
    pub link_type: LinkType,
}

impl RawFrame {
    /// Frame captured in full, stamped now
    pub fn new(data: Vec<u8>, link_type: LinkType) -> Self {
        Self {
            timestamp: Utc::now(),
            wire_len: data.len(),
            data,
            link_type,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.wire_len
    }
}

/// Outcome of a single read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Frame(RawFrame),
    /// The poll interval elapsed without traffic
    Timeout,
    /// The source has no more frames
    EndOfStream,
}

/// Source of interfaces and capture handles
pub trait CaptureBackend: Send + Sync {
    /// Enumerate capture-capable interfaces
    fn interfaces(&self) -> Result<Vec<InterfaceInfo>>;

    /// Open a capture handle on one interface
    fn open(&self, interface: &InterfaceInfo, options: &OpenOptions)
        -> Result<Box<dyn CaptureHandle>>;
}

/// An open capture on one interface
pub trait CaptureHandle {
    /// Install a compiled filter; only called for non-empty selections
    fn apply_filter(&mut self, filter: &CaptureFilter) -> Result<()>;

    /// Read the next frame, blocking at most the poll interval
    fn next_frame(&mut self) -> Result<FrameEvent>;

    /// Receive and drop counters, when the transport keeps them
    fn stats(&mut self) -> Option<HandleStats> {
        None
    }

    /// Release the handle; called once before the handle is dropped
    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_options_follow_settings() {
        let mut settings = Settings::default();
        settings.promiscuous = true;
        settings.capture.snaplen = 128;
        settings.capture.poll_interval_ms = 25;

        let options = OpenOptions::from_settings(&settings);
        assert!(options.promiscuous);
        assert_eq!(options.snaplen, 128);
        assert_eq!(options.poll_interval, Duration::from_millis(25));
    }

    #[test]
    fn test_raw_frame_truncation() {
        let mut frame = RawFrame::new(vec![0; 60], LinkType::Ethernet);
        assert!(!frame.is_truncated());
        frame.wire_len = 1514;
        assert!(frame.is_truncated());
    }
}
