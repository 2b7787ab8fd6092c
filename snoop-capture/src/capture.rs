//! Live capture through libpcap

use chrono::{DateTime, Utc};
use pcap::{Active, Capture, Device};
use snoop_core::{Error, InterfaceInfo, Result};
use snoop_packet::LinkType;
use tracing::debug;

use crate::backend::{CaptureBackend, CaptureHandle, FrameEvent, OpenOptions, RawFrame};
use crate::filters::CaptureFilter;
use crate::interface::interface_from_device;
use crate::stats::HandleStats;

/// Backend over the host's libpcap devices
#[derive(Debug, Clone, Copy, Default)]
pub struct PcapBackend;

impl PcapBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for PcapBackend {
    /// Every device reported up; pseudo-devices such as `any` included
    fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        let devices = Device::list().map_err(|e| Error::Enumeration(e.to_string()))?;
        Ok(devices
            .iter()
            .filter(|device| device.flags.is_up())
            .map(interface_from_device)
            .collect())
    }

    fn open(&self, interface: &InterfaceInfo, options: &OpenOptions) -> Result<Box<dyn CaptureHandle>> {
        let open_error = |e: pcap::Error| Error::InterfaceOpen {
            interface: interface.name.clone(),
            reason: e.to_string(),
        };

        debug!(interface = %interface.name, ?options, "Opening pcap handle");

        let timeout_ms = i32::try_from(options.poll_interval.as_millis()).unwrap_or(i32::MAX);
        let mut capture = Capture::from_device(interface.name.as_str())
            .map_err(open_error)?
            .promisc(options.promiscuous)
            .snaplen(options.snaplen)
            .timeout(timeout_ms)
            .immediate_mode(options.immediate_mode);

        if options.buffer_size > 0 {
            capture = capture.buffer_size(options.buffer_size);
        }

        let capture = capture.open().map_err(open_error)?;
        let link_type = LinkType::from_dlt(capture.get_datalink().0);
        debug!(interface = %interface.name, ?link_type, "Handle open");

        Ok(Box::new(PcapHandle {
            interface: interface.name.clone(),
            capture: Some(capture),
            link_type,
        }))
    }
}

/// An active libpcap capture on one device
pub struct PcapHandle {
    interface: String,
    capture: Option<Capture<Active>>,
    link_type: LinkType,
}

impl PcapHandle {
    fn read_error(&self, reason: impl ToString) -> Error {
        Error::Read {
            interface: self.interface.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Capture time from a pcap header's seconds and microseconds
fn header_timestamp(secs: i64, micros: i64) -> DateTime<Utc> {
    let micros = micros.clamp(0, 999_999);
    DateTime::from_timestamp(secs, (micros * 1000) as u32).unwrap_or_else(Utc::now)
}

impl CaptureHandle for PcapHandle {
    fn apply_filter(&mut self, filter: &CaptureFilter) -> Result<()> {
        let Some(expression) = filter.expression() else {
            return Ok(());
        };
        let capture = self.capture.as_mut().ok_or_else(|| Error::FilterApply {
            interface: self.interface.clone(),
            reason: "handle closed".to_string(),
        })?;

        capture
            .filter(&expression, true)
            .map_err(|e| Error::FilterApply {
                interface: self.interface.clone(),
                reason: e.to_string(),
            })
    }

    fn next_frame(&mut self) -> Result<FrameEvent> {
        let link_type = self.link_type;
        let Some(capture) = self.capture.as_mut() else {
            return Ok(FrameEvent::EndOfStream);
        };

        let outcome = match capture.next_packet() {
            Ok(packet) => Ok(FrameEvent::Frame(RawFrame {
                timestamp: header_timestamp(
                    packet.header.ts.tv_sec as i64,
                    packet.header.ts.tv_usec as i64,
                ),
                data: packet.data.to_vec(),
                wire_len: packet.header.len as usize,
                link_type,
            })),
            Err(pcap::Error::TimeoutExpired) => Ok(FrameEvent::Timeout),
            Err(pcap::Error::NoMorePackets) => Ok(FrameEvent::EndOfStream),
            Err(e) => Err(e),
        };
        outcome.map_err(|e| self.read_error(e))
    }

    fn stats(&mut self) -> Option<HandleStats> {
        let capture = self.capture.as_mut()?;
        match capture.stats() {
            Ok(stat) => Some(HandleStats::from(stat)),
            Err(e) => {
                debug!(interface = %self.interface, error = %e, "Handle statistics unavailable");
                None
            }
        }
    }

    fn close(&mut self) {
        if self.capture.take().is_some() {
            debug!(interface = %self.interface, "Handle closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_timestamp() {
        let ts = header_timestamp(1_700_000_000, 250_000);
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_micros(), 250_000);

        // Out-of-range microseconds are clamped rather than rejected
        let ts = header_timestamp(1_700_000_000, 2_000_000);
        assert_eq!(ts.timestamp_subsec_micros(), 999_999);
    }

    #[test]
    fn test_list_interfaces() {
        // Enumeration may need privileges or may find no devices in a sandbox
        match PcapBackend::new().interfaces() {
            Ok(interfaces) => {
                for iface in interfaces {
                    assert!(!iface.name.is_empty());
                    assert!(iface.flags.up);
                }
            }
            Err(e) => println!("Could not enumerate interfaces: {}", e),
        }
    }

    #[test]
    fn test_open_nonexistent_interface() {
        let result = PcapBackend::new().open(
            &InterfaceInfo::new("nonexistent_interface_xyz"),
            &OpenOptions::default(),
        );
        match result {
            Err(Error::InterfaceOpen { interface, .. }) => {
                assert_eq!(interface, "nonexistent_interface_xyz")
            }
            Err(e) => panic!("Expected InterfaceOpen, got {}", e),
            Ok(_) => panic!("Opening a nonexistent interface should fail"),
        }
    }
}
