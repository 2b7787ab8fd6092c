//! One-line-per-record console display

use chrono::Local;
use crossterm::style::{Color, Stylize};
use snoop_core::{CapturedPacket, Error, Result};
use std::io::Write;

use super::RecordWriter;

/// Terminal color for a protocol label, if it has one
pub fn protocol_color(protocol: &str) -> Option<Color> {
    match protocol {
        "TCP" => Some(Color::DarkRed),
        "UDP" => Some(Color::Cyan),
        "SCTP" => Some(Color::DarkMagenta),
        "IPv4" => Some(Color::Magenta),
        "IPv6" => Some(Color::DarkGreen),
        _ => None,
    }
}

/// Writes a summary line per record to any `Write`
///
/// Wrap in a [`LockedSink`](super::LockedSink) to share it between workers.
#[derive(Debug)]
pub struct ConsoleWriter<W> {
    out: W,
    color: bool,
}

impl<W: Write + Send> ConsoleWriter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn endpoint(ip: String, port: String) -> String {
        if port == "-" {
            ip
        } else {
            format!("{}:{}", ip, port)
        }
    }

    fn render(&self, packet: &CapturedPacket) -> String {
        let label = format!("{:<8}", packet.protocol);
        let label = match protocol_color(&packet.protocol) {
            Some(color) if self.color => label.with(color).to_string(),
            _ => label,
        };

        let mut line = format!(
            "{} {:<10} {} {} -> {} {} bytes",
            packet.timestamp.with_timezone(&Local).format("%H:%M:%S%.3f"),
            packet.interface,
            label,
            Self::endpoint(packet.source_ip_text(), packet.source_port_text()),
            Self::endpoint(packet.destination_ip_text(), packet.destination_port_text()),
            packet.size
        );
        if packet.truncated {
            line.push_str(&format!(" (truncated from {})", packet.wire_length));
        }
        line
    }
}

impl<W: Write + Send> RecordWriter for ConsoleWriter<W> {
    fn write_record(&mut self, packet: &CapturedPacket) -> Result<()> {
        let line = self.render(packet);
        writeln!(self.out, "{}", line).map_err(|e| Error::sink_write("console", e))
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().map_err(|e| Error::sink_write("console", e))
    }
}
