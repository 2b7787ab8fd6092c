//! In-memory capture backend and sinks for tests

use crate::backend::{CaptureBackend, CaptureHandle, FrameEvent, OpenOptions, RawFrame};
use crate::filters::CaptureFilter;
use crate::sink::Sink;
use crate::stats::HandleStats;
use chrono::Utc;
use parking_lot::Mutex;
use snoop_core::{CapturedPacket, Error, InterfaceInfo, Result};
use snoop_packet::{decode, FrameBuilder, LinkType, MacAddress};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SRC_MAC: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
const DST_MAC: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);

pub(crate) fn tcp_frame(src_port: u16) -> Vec<u8> {
    FrameBuilder::ethernet(SRC_MAC, DST_MAC)
        .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
        .tcp(src_port, 80)
        .payload(b"GET / HTTP/1.1\r\n".to_vec())
        .build()
}

pub(crate) fn udp_frame(src_port: u16) -> Vec<u8> {
    FrameBuilder::ethernet(SRC_MAC, DST_MAC)
        .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 53))
        .udp(src_port, 53)
        .payload(vec![0x12, 0x34, 0x01, 0x00])
        .build()
}

pub(crate) fn icmp_frame() -> Vec<u8> {
    FrameBuilder::ethernet(SRC_MAC, DST_MAC)
        .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
        .icmpv4_echo(1, 1)
        .payload(b"ping".to_vec())
        .build()
}

pub(crate) fn sample_packet(interface: &str, protocol: &str) -> CapturedPacket {
    CapturedPacket {
        interface: interface.to_string(),
        timestamp: Utc::now(),
        truncated: false,
        protocol: protocol.to_string(),
        source_ip: Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
        destination_ip: Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))),
        source_port: Some(40000),
        destination_port: Some(443),
        size: 60,
        wire_length: 60,
        dump: "00000000  02 00 00 00 00 02                                 |......|\n".to_string(),
    }
}

/// What a scripted handle does once its frames run out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ending {
    EndOfStream,
    /// Block for the poll interval, then report a timeout, forever
    Idle,
    /// Replay the frames continuously
    Repeat,
}

#[derive(Debug, Clone)]
pub(crate) struct Script {
    frames: Vec<Vec<u8>>,
    ending: Ending,
    fail_open: Option<String>,
    fail_filter: Option<String>,
    read_error_after: Option<usize>,
}

impl Script {
    pub(crate) fn frames(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames,
            ending: Ending::EndOfStream,
            fail_open: None,
            fail_filter: None,
            read_error_after: None,
        }
    }

    pub(crate) fn idle() -> Self {
        Self::frames(Vec::new()).ending(Ending::Idle)
    }

    pub(crate) fn ending(mut self, ending: Ending) -> Self {
        self.ending = ending;
        self
    }

    pub(crate) fn fail_open(mut self, reason: &str) -> Self {
        self.fail_open = Some(reason.to_string());
        self
    }

    pub(crate) fn fail_filter(mut self, reason: &str) -> Self {
        self.fail_filter = Some(reason.to_string());
        self
    }

    /// Fail the read following the first `delivered` frames
    pub(crate) fn read_error_after(mut self, delivered: usize) -> Self {
        self.read_error_after = Some(delivered);
        self
    }
}

/// Scripted interfaces behind the [`CaptureBackend`] seam
#[derive(Debug, Default)]
pub(crate) struct MemoryBackend {
    interfaces: Mutex<Vec<(InterfaceInfo, Script)>>,
    enumeration_error: Mutex<Option<String>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MemoryBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, name: &str, script: Script) {
        let mut info = InterfaceInfo::new(name);
        info.flags.up = true;
        info.flags.running = true;
        self.interfaces.lock().push((info, script));
    }

    pub(crate) fn add_idle(&self, name: &str) {
        self.add(name, Script::idle());
    }

    pub(crate) fn fail_enumeration(&self, reason: &str) {
        *self.enumeration_error.lock() = Some(reason.to_string());
    }

    /// Handles successfully opened
    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for MemoryBackend {
    fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        if let Some(reason) = self.enumeration_error.lock().clone() {
            return Err(Error::Enumeration(reason));
        }
        Ok(self
            .interfaces
            .lock()
            .iter()
            .map(|(info, _)| info.clone())
            .collect())
    }

    fn open(&self, interface: &InterfaceInfo, options: &OpenOptions) -> Result<Box<dyn CaptureHandle>> {
        let script = self
            .interfaces
            .lock()
            .iter()
            .find(|(info, _)| info.name == interface.name)
            .map(|(_, script)| script.clone())
            .ok_or_else(|| Error::InterfaceOpen {
                interface: interface.name.clone(),
                reason: "no such device".to_string(),
            })?;

        if let Some(reason) = &script.fail_open {
            return Err(Error::InterfaceOpen {
                interface: interface.name.clone(),
                reason: reason.clone(),
            });
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryHandle {
            interface: interface.name.clone(),
            script,
            filter: CaptureFilter::unfiltered(),
            poll_interval: options.poll_interval,
            position: 0,
            delivered: 0,
            closed: Arc::clone(&self.closed),
            is_closed: false,
        }))
    }
}

struct MemoryHandle {
    interface: String,
    script: Script,
    filter: CaptureFilter,
    poll_interval: Duration,
    position: usize,
    delivered: usize,
    closed: Arc<AtomicUsize>,
    is_closed: bool,
}

impl MemoryHandle {
    fn next_scripted(&mut self) -> Option<Vec<u8>> {
        let frames = &self.script.frames;
        if frames.is_empty() {
            return None;
        }
        match self.script.ending {
            Ending::Repeat => {
                let frame = frames[self.position % frames.len()].clone();
                self.position += 1;
                Some(frame)
            }
            _ => {
                let frame = frames.get(self.position).cloned();
                self.position += 1;
                frame
            }
        }
    }
}

impl CaptureHandle for MemoryHandle {
    fn apply_filter(&mut self, filter: &CaptureFilter) -> Result<()> {
        if let Some(reason) = &self.script.fail_filter {
            return Err(Error::FilterApply {
                interface: self.interface.clone(),
                reason: reason.clone(),
            });
        }
        self.filter = filter.clone();
        Ok(())
    }

    fn next_frame(&mut self) -> Result<FrameEvent> {
        if self.script.read_error_after == Some(self.delivered) {
            return Err(Error::Read {
                interface: self.interface.clone(),
                reason: "device went away".to_string(),
            });
        }

        // Bounded so a repeating script whose frames are all filtered still yields
        let attempts = self.script.frames.len().max(1);
        for _ in 0..attempts {
            let Some(data) = self.next_scripted() else {
                break;
            };
            if !self.filter.matches(&decode(LinkType::Ethernet, &data)) {
                continue;
            }
            if self.script.ending == Ending::Repeat {
                thread::sleep(Duration::from_micros(200));
            }
            self.delivered += 1;
            return Ok(FrameEvent::Frame(RawFrame::new(data, LinkType::Ethernet)));
        }

        match self.script.ending {
            Ending::EndOfStream if self.position >= self.script.frames.len() => {
                Ok(FrameEvent::EndOfStream)
            }
            Ending::EndOfStream | Ending::Repeat => Ok(FrameEvent::Timeout),
            Ending::Idle => {
                thread::sleep(self.poll_interval);
                Ok(FrameEvent::Timeout)
            }
        }
    }

    fn stats(&mut self) -> Option<HandleStats> {
        Some(HandleStats {
            received: self.delivered as u64,
            dropped: 0,
            if_dropped: 0,
        })
    }

    fn close(&mut self) {
        if !self.is_closed {
            self.is_closed = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Sink recording everything it accepts
#[derive(Debug)]
pub(crate) struct CountingSink {
    name: String,
    records: Mutex<Vec<Arc<CapturedPacket>>>,
    finished: AtomicBool,
}

impl CountingSink {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Mutex::new(Vec::new()),
            finished: AtomicBool::new(false),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.records.lock().len()
    }

    pub(crate) fn records(&self) -> Vec<Arc<CapturedPacket>> {
        self.records.lock().clone()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Sink for CountingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept(&self, packet: Arc<CapturedPacket>) -> Result<()> {
        self.records.lock().push(packet);
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}
