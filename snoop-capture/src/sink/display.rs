//! Display feed for interactive front ends

use chrono::Local;
use parking_lot::RwLock;
use snoop_core::{CapturedPacket, Result};
use std::sync::Arc;

use super::Sink;

const TIME_FORMAT: &str = "%H:%M:%S %d-%m-%Y";

/// One row of the live packet table, all columns pre-rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    /// Local capture time, `HH:MM:SS DD-MM-YYYY`
    pub time: String,
    pub interface: String,
    pub protocol: String,
    pub size: usize,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: String,
    pub dst_port: String,
    pub truncated: bool,
    pub dump: String,
}

impl From<&CapturedPacket> for DisplayRow {
    fn from(packet: &CapturedPacket) -> Self {
        Self {
            time: packet
                .timestamp
                .with_timezone(&Local)
                .format(TIME_FORMAT)
                .to_string(),
            interface: packet.interface.clone(),
            protocol: packet.protocol.clone(),
            size: packet.size,
            src_ip: packet.source_ip_text(),
            dst_ip: packet.destination_ip_text(),
            src_port: packet.source_port_text(),
            dst_port: packet.destination_port_text(),
            truncated: packet.truncated,
            dump: packet.dump.clone(),
        }
    }
}

/// Append-only feed of display rows
///
/// Cloning shares the feed, so a front end can keep one clone and poll
/// [`rows_since`](Self::rows_since) while the session appends.
#[derive(Debug, Clone, Default)]
pub struct RowFeed {
    rows: Arc<RwLock<Vec<DisplayRow>>>,
}

impl RowFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Snapshot of every row
    pub fn rows(&self) -> Vec<DisplayRow> {
        self.rows.read().clone()
    }

    /// Rows appended after the first `start`
    pub fn rows_since(&self, start: usize) -> Vec<DisplayRow> {
        self.rows
            .read()
            .get(start..)
            .map(<[DisplayRow]>::to_vec)
            .unwrap_or_default()
    }
}

impl Sink for RowFeed {
    fn name(&self) -> &str {
        "display"
    }

    fn accept(&self, packet: Arc<CapturedPacket>) -> Result<()> {
        self.rows.write().push(DisplayRow::from(packet.as_ref()));
        Ok(())
    }
}
