//! Per-interface capture worker
//!
//! A worker owns one capture handle for its whole life and moves through
//! `Opening -> Filtering -> Reading -> Draining -> Closed`. Open and filter
//! failures skip ahead; every path that opened a handle drains and closes it.

use parking_lot::Mutex;
use snoop_core::{Error, InterfaceInfo};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{CaptureBackend, CaptureHandle, FrameEvent, OpenOptions, RawFrame};
use crate::cancel::CancelToken;
use crate::classifier::Classifier;
use crate::filters::CaptureFilter;
use crate::sink::SinkSet;
use crate::stats::{CaptureStats, HandleStats, StatsAccumulator};

/// Lifecycle stage of a capture worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    Opening,
    Filtering,
    Reading,
    Draining,
    Closed,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Opening => "opening",
            WorkerState::Filtering => "filtering",
            WorkerState::Reading => "reading",
            WorkerState::Draining => "draining",
            WorkerState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a worker stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The session was cancelled
    Cancelled,
    /// The source reported no further frames
    EndOfStream,
    /// Open, filter or read failure, see [`WorkerReport::error`]
    Failed,
}

/// Final account of one worker
#[derive(Debug)]
pub struct WorkerReport {
    pub interface: String,
    pub state: WorkerState,
    pub exit: WorkerExit,
    pub error: Option<Error>,
    pub stats: CaptureStats,
}

impl WorkerReport {
    pub(crate) fn panicked(interface: String, stats: CaptureStats) -> Self {
        Self {
            error: Some(Error::WorkerPanicked(interface.clone())),
            interface,
            state: WorkerState::Closed,
            exit: WorkerExit::Failed,
            stats,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Observable state of a running worker
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    state: Arc<Mutex<WorkerState>>,
    stats: StatsAccumulator,
}

impl WorkerStatus {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(WorkerState::Opening)),
            stats: StatsAccumulator::new(),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Packets dispatched so far
    pub fn packets(&self) -> u64 {
        self.stats.packets()
    }

    pub(crate) fn stats(&self) -> &StatsAccumulator {
        &self.stats
    }
}

/// Captures on one interface until cancelled, exhausted or failed
pub struct CaptureWorker {
    interface: InterfaceInfo,
    backend: Arc<dyn CaptureBackend>,
    options: OpenOptions,
    filter: Arc<CaptureFilter>,
    sinks: SinkSet,
    cancel: CancelToken,
    classifier: Classifier,
    status: WorkerStatus,
}

impl CaptureWorker {
    pub fn new(
        interface: InterfaceInfo,
        backend: Arc<dyn CaptureBackend>,
        options: OpenOptions,
        filter: Arc<CaptureFilter>,
        sinks: SinkSet,
        cancel: CancelToken,
    ) -> Self {
        Self {
            interface,
            backend,
            options,
            filter,
            sinks,
            cancel,
            classifier: Classifier::new(),
            status: WorkerStatus::new(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface.name
    }

    /// Handle for observing this worker from another thread
    pub fn status(&self) -> WorkerStatus {
        self.status.clone()
    }

    fn set_state(&self, state: WorkerState) {
        *self.status.state.lock() = state;
        debug!(interface = %self.interface.name, state = %state, "Worker state");
    }

    /// Run to completion on the calling thread
    pub fn run(self) -> WorkerReport {
        info!(interface = %self.interface.name, "Capture worker started");

        self.set_state(WorkerState::Opening);
        let mut handle = match self.backend.open(&self.interface, &self.options) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(interface = %self.interface.name, error = %e, "Failed to open interface");
                self.set_state(WorkerState::Closed);
                return self.report(WorkerExit::Failed, Some(e), None);
            }
        };

        let (exit, error) = match self.install_filter(handle.as_mut()) {
            Ok(()) => {
                self.set_state(WorkerState::Reading);
                self.read_loop(handle.as_mut())
            }
            Err(e) => {
                warn!(interface = %self.interface.name, error = %e, "Failed to apply filter");
                (WorkerExit::Failed, Some(e))
            }
        };

        self.set_state(WorkerState::Draining);
        let kernel = handle.stats();
        handle.close();
        drop(handle);
        self.set_state(WorkerState::Closed);

        let report = self.report(exit, error, kernel);
        info!(
            interface = %report.interface,
            packets = report.stats.packets_captured,
            exit = ?report.exit,
            "Capture worker finished"
        );
        report
    }

    fn install_filter(&self, handle: &mut dyn CaptureHandle) -> snoop_core::Result<()> {
        if self.filter.is_unfiltered() {
            return Ok(());
        }
        self.set_state(WorkerState::Filtering);
        handle.apply_filter(&self.filter)?;
        debug!(interface = %self.interface.name, filter = %self.filter, "Filter applied");
        Ok(())
    }

    fn read_loop(&self, handle: &mut dyn CaptureHandle) -> (WorkerExit, Option<Error>) {
        loop {
            if self.cancel.is_cancelled() {
                return (WorkerExit::Cancelled, None);
            }

            match handle.next_frame() {
                Ok(FrameEvent::Frame(frame)) => self.deliver(&frame),
                Ok(FrameEvent::Timeout) => {}
                Ok(FrameEvent::EndOfStream) => {
                    debug!(interface = %self.interface.name, "End of stream");
                    return (WorkerExit::EndOfStream, None);
                }
                Err(e) => {
                    warn!(interface = %self.interface.name, error = %e, "Read failure");
                    return (WorkerExit::Failed, Some(e));
                }
            }
        }
    }

    fn deliver(&self, frame: &RawFrame) {
        let packet = Arc::new(self.classifier.classify_frame(&self.interface.name, frame));
        let stats = self.status.stats();
        stats.record_packet(packet.size);

        let failures = self.sinks.dispatch(packet);
        if failures > 0 {
            stats.record_sink_failures(failures);
        }
    }

    fn report(&self, exit: WorkerExit, error: Option<Error>, kernel: Option<HandleStats>) -> WorkerReport {
        WorkerReport {
            interface: self.interface.name.clone(),
            state: self.status.state(),
            exit,
            error,
            stats: self.status.stats().snapshot(kernel),
        }
    }
}
