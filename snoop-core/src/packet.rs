//! Classified packet records

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::net::IpAddr;

/// One classified frame, as delivered to every sink
///
/// Address fields are set only when an IP layer was decoded and port fields
/// only when a port-bearing transport layer was decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPacket {
    /// Interface the frame was captured on
    pub interface: String,
    /// Capture timestamp reported by the transport
    pub timestamp: DateTime<Utc>,
    /// Fewer bytes were captured than were on the wire
    pub truncated: bool,
    /// Protocol label derived from the layer stack
    pub protocol: String,
    pub source_ip: Option<IpAddr>,
    pub destination_ip: Option<IpAddr>,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
    /// Captured length in bytes
    pub size: usize,
    /// Length of the frame on the wire
    pub wire_length: usize,
    /// Hex dump of the captured bytes
    pub dump: String,
}

fn or_dash<T: fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl CapturedPacket {
    pub fn source_ip_text(&self) -> String {
        or_dash(&self.source_ip)
    }

    pub fn destination_ip_text(&self) -> String {
        or_dash(&self.destination_ip)
    }

    pub fn source_port_text(&self) -> String {
        or_dash(&self.source_port)
    }

    pub fn destination_port_text(&self) -> String {
        or_dash(&self.destination_port)
    }
}

/// Renders the human-readable log block; the block ends with a newline
impl fmt::Display for CapturedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Packet\tTime: {}\tTruncated: {}\tInterface: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.truncated,
            self.interface
        )?;
        writeln!(
            f,
            "\tProtocol: {}\tSourceIP: {}\tDestIP: {}",
            self.protocol,
            self.source_ip_text(),
            self.destination_ip_text()
        )?;
        writeln!(
            f,
            "\tSourcePort: {}\tDestPort: {}\tPacketSize: {}",
            self.source_port_text(),
            self.destination_port_text(),
            self.size
        )?;
        writeln!(f, "Dump:")?;
        write!(f, "{}", self.dump)?;
        if !self.dump.is_empty() && !self.dump.ends_with('\n') {
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::net::Ipv4Addr;

    fn sample() -> CapturedPacket {
        CapturedPacket {
            interface: "eth0".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
            truncated: false,
            protocol: "TCP".into(),
            source_ip: Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
            destination_ip: Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))),
            source_port: Some(40000),
            destination_port: Some(443),
            size: 74,
            wire_length: 74,
            dump: "00000000  45 00                                             |E.|\n".into(),
        }
    }

    #[test]
    fn test_log_block_layout() {
        let block = sample().to_string();
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Packet\tTime: 2024-03-01T12:30:05.000000Z"));
        assert!(lines[0].contains("Truncated: false"));
        assert_eq!(lines[1], "\tProtocol: TCP\tSourceIP: 10.0.0.1\tDestIP: 10.0.0.2");
        assert_eq!(lines[2], "\tSourcePort: 40000\tDestPort: 443\tPacketSize: 74");
        assert_eq!(lines[3], "Dump:");
        assert!(block.ends_with('\n'));
    }

    #[test]
    fn test_absent_fields_render_as_dash() {
        let mut packet = sample();
        packet.source_ip = None;
        packet.destination_ip = None;
        packet.source_port = None;
        packet.destination_port = None;
        packet.protocol = "Ethernet".into();

        let block = packet.to_string();
        assert!(block.contains("SourceIP: -\tDestIP: -"));
        assert!(block.contains("SourcePort: -\tDestPort: -"));
    }
}
