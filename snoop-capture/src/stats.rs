//! Per-interface capture statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counters kept by the capture transport itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    /// Frames that passed the filter
    pub received: u64,
    /// Frames dropped for lack of buffer space
    pub dropped: u64,
    /// Frames dropped by the network interface or its driver
    pub if_dropped: u64,
}

impl From<pcap::Stat> for HandleStats {
    fn from(stat: pcap::Stat) -> Self {
        Self {
            received: stat.received as u64,
            dropped: stat.dropped as u64,
            if_dropped: stat.if_dropped as u64,
        }
    }
}

/// Statistics for one capture worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureStats {
    /// Frames classified and dispatched
    pub packets_captured: u64,
    /// Captured bytes across those frames
    pub bytes_captured: u64,
    /// Deliveries some sink rejected
    pub sink_failures: u64,
    /// Time spent reading
    pub duration: Duration,
    /// Packets per second
    pub packets_per_second: f64,
    /// Bytes per second
    pub bytes_per_second: f64,
    /// Transport counters, collected while draining
    pub kernel: Option<HandleStats>,
}

impl CaptureStats {
    /// Kernel drop rate as percentage of frames seen by the kernel
    pub fn drop_rate(&self) -> f64 {
        match self.kernel {
            Some(kernel) if kernel.received + kernel.dropped > 0 => {
                kernel.dropped as f64 / (kernel.received + kernel.dropped) as f64 * 100.0
            }
            _ => 0.0,
        }
    }

    /// Format statistics as a one-line summary
    pub fn format(&self) -> String {
        let mut line = format!(
            "{} packets ({} bytes) in {:.2}s, {:.2} pps",
            self.packets_captured,
            self.bytes_captured,
            self.duration.as_secs_f64(),
            self.packets_per_second
        );
        if let Some(kernel) = self.kernel {
            line.push_str(&format!(
                ", kernel dropped {} ({:.2}%), interface dropped {}",
                kernel.dropped,
                self.drop_rate(),
                kernel.if_dropped
            ));
        }
        if self.sink_failures > 0 {
            line.push_str(&format!(", {} sink failures", self.sink_failures));
        }
        line
    }
}

fn per_second(count: u64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Thread-safe statistics accumulator for live capture
///
/// The worker records into it; the session reads live counts from a clone.
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    packets: Arc<AtomicU64>,
    bytes: Arc<AtomicU64>,
    sink_failures: Arc<AtomicU64>,
    start_time: Instant,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self {
            packets: Arc::new(AtomicU64::new(0)),
            bytes: Arc::new(AtomicU64::new(0)),
            sink_failures: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record a dispatched packet
    pub fn record_packet(&self, size: usize) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_sink_failures(&self, count: usize) {
        self.sink_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self, kernel: Option<HandleStats>) -> CaptureStats {
        let packets_captured = self.packets();
        let bytes_captured = self.bytes();
        let duration = self.elapsed();

        CaptureStats {
            packets_captured,
            bytes_captured,
            sink_failures: self.sink_failures(),
            duration,
            packets_per_second: per_second(packets_captured, duration),
            bytes_per_second: per_second(bytes_captured, duration),
            kernel,
        }
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
