//! Frame classification into [`CapturedPacket`] records

use crate::backend::RawFrame;
use chrono::{DateTime, Utc};
use snoop_core::CapturedPacket;
use snoop_packet::{decode, hex_dump, LayerStack};

/// Label used when nothing could be decoded
pub const UNKNOWN_PROTOCOL: &str = "Unknown";

/// Capture metadata accompanying a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    pub timestamp: DateTime<Utc>,
    pub captured_len: usize,
    pub wire_len: usize,
}

impl From<&RawFrame> for FrameMeta {
    fn from(frame: &RawFrame) -> Self {
        Self {
            timestamp: frame.timestamp,
            captured_len: frame.data.len(),
            wire_len: frame.wire_len,
        }
    }
}

/// Protocol label of a decoded stack
///
/// The label is the type name of the second-to-last layer: the innermost
/// layer carrying a header, with the trailing payload or decode failure
/// skipped. A single-layer stack is labeled by that layer.
pub fn protocol_label(stack: &LayerStack) -> &'static str {
    let layers = stack.layers();
    match layers.len() {
        0 => UNKNOWN_PROTOCOL,
        1 => layers[0].name(),
        n => layers[n - 2].name(),
    }
}

/// Stateless classifier shared by every worker
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// Build the record for an already decoded frame
    pub fn classify(
        &self,
        interface: &str,
        stack: &LayerStack,
        meta: FrameMeta,
        data: &[u8],
    ) -> CapturedPacket {
        let (source_ip, destination_ip) = match stack.addresses() {
            Some((src, dst)) => (Some(src), Some(dst)),
            None => (None, None),
        };
        let (source_port, destination_port) = match stack.ports() {
            Some((src, dst)) => (Some(src), Some(dst)),
            None => (None, None),
        };

        CapturedPacket {
            interface: interface.to_string(),
            timestamp: meta.timestamp,
            truncated: meta.captured_len < meta.wire_len,
            protocol: protocol_label(stack).to_string(),
            source_ip,
            destination_ip,
            source_port,
            destination_port,
            size: meta.captured_len,
            wire_length: meta.wire_len,
            dump: hex_dump(data),
        }
    }

    /// Decode a frame with its link type, then classify it
    pub fn classify_frame(&self, interface: &str, frame: &RawFrame) -> CapturedPacket {
        let stack = decode(frame.link_type, &frame.data);
        self.classify(interface, &stack, FrameMeta::from(frame), &frame.data)
    }
}
