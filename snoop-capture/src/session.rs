//! Capture session lifecycle
//!
//! [`SessionController::start`] validates the settings, compiles the filter,
//! enumerates interfaces and spawns one worker thread per interface plus an
//! optional deadline thread. The returned [`SessionHandle`] stops the session
//! and joins it into a [`SessionReport`].

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use snoop_core::{Error, InterfaceInfo, Result, Settings};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backend::{CaptureBackend, OpenOptions};
use crate::cancel::CancelToken;
use crate::capture::PcapBackend;
use crate::filters::CaptureFilter;
use crate::interface::resolve_interfaces;
use crate::sink::file::FILE_SINK_NAME;
use crate::sink::{FileLog, LockedSink, Sink, SinkSet};
use crate::worker::{CaptureWorker, WorkerReport, WorkerState, WorkerStatus};

/// What ended a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The configured duration elapsed
    Deadline,
    /// An explicit stop request
    Stopped,
    /// Every worker finished on its own
    Exhausted,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::Deadline => "deadline reached",
            EndReason::Stopped => "stopped",
            EndReason::Exhausted => "all interfaces finished",
        };
        f.write_str(text)
    }
}

/// State shared by the controller, the workers and the deadline thread
#[derive(Debug)]
struct SessionShared {
    id: Uuid,
    cancel: CancelToken,
    end_reason: Mutex<Option<EndReason>>,
}

impl SessionShared {
    /// Record `reason` unless one is already recorded, then cancel
    fn end(&self, reason: EndReason) {
        {
            let mut recorded = self.end_reason.lock();
            if recorded.is_none() {
                *recorded = Some(reason);
                info!(session = %self.id, reason = %reason, "Session ending");
            }
        }
        self.cancel.cancel();
    }

    fn end_reason(&self) -> Option<EndReason> {
        *self.end_reason.lock()
    }
}

/// Starts capture sessions over a backend
#[derive(Clone)]
pub struct SessionController {
    backend: Arc<dyn CaptureBackend>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self { backend }
    }

    /// Controller over the host's libpcap devices
    pub fn pcap() -> Self {
        Self::new(Arc::new(PcapBackend::new()))
    }

    /// Interfaces the backend would capture on
    pub fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        self.backend.interfaces()
    }

    /// Start a session delivering to `sinks`
    ///
    /// Fails before any worker starts when the settings are invalid, the
    /// protocol selection does not compile, no interface is available or
    /// the session log cannot be created.
    pub fn start(&self, settings: &Settings, sinks: Vec<Arc<dyn Sink>>) -> Result<SessionHandle> {
        settings.validate()?;
        let filter = Arc::new(CaptureFilter::compile(&settings.protocols).map_err(|e| {
            error!(error = %e, "Invalid protocol selection");
            e
        })?);

        let interfaces = resolve_interfaces(self.backend.as_ref(), &settings.interfaces)
            .map_err(|e| {
                error!(error = %e, "No interface to capture on");
                e
            })?;

        let id = Uuid::now_v7();
        let started_at = Utc::now();

        let mut sinks = SinkSet::new(sinks);
        let mut output_file = None;
        if settings.save {
            let log = FileLog::create(&settings.output_dir, started_at.with_timezone(&Local))
                .map_err(|e| {
                    error!(session = %id, error = %e, "Cannot create session log");
                    e
                })?;
            output_file = Some(log.path().to_path_buf());
            sinks.push(Arc::new(LockedSink::new(FILE_SINK_NAME, log)));
        }

        let shared = Arc::new(SessionShared {
            id,
            cancel: CancelToken::new(),
            end_reason: Mutex::new(None),
        });

        info!(
            session = %id,
            interfaces = interfaces.len(),
            filter = %filter,
            sinks = ?sinks.names(),
            duration_ms = settings.duration_millis,
            "Starting capture session"
        );

        let mut handle = SessionHandle {
            id,
            started_at,
            shared,
            workers: Vec::with_capacity(interfaces.len()),
            deadline: None,
            sinks,
            output_file,
        };

        let options = OpenOptions::from_settings(settings);
        for interface in interfaces {
            let worker = CaptureWorker::new(
                interface,
                Arc::clone(&self.backend),
                options.clone(),
                Arc::clone(&filter),
                handle.sinks.clone(),
                handle.shared.cancel.clone(),
            );
            let name = worker.interface().to_string();
            let status = worker.status();
            let thread = thread::Builder::new()
                .name(format!("capture-{}", name))
                .spawn(move || worker.run())
                .map_err(|e| handle.abort(e))?;

            handle.workers.push(WorkerSlot {
                interface: name,
                status,
                thread,
            });
        }

        if let Some(duration) = settings.duration() {
            let shared = Arc::clone(&handle.shared);
            let thread = thread::Builder::new()
                .name("capture-deadline".to_string())
                .spawn(move || {
                    if !shared.cancel.wait_timeout(duration) {
                        shared.end(EndReason::Deadline);
                    }
                })
                .map_err(|e| handle.abort(e))?;
            handle.deadline = Some(thread);
        }

        Ok(handle)
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController").finish_non_exhaustive()
    }
}

struct WorkerSlot {
    interface: String,
    status: WorkerStatus,
    thread: JoinHandle<WorkerReport>,
}

/// Cloneable stop request for a running session
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<SessionShared>,
}

impl StopHandle {
    /// Ask every worker to stop. Idempotent; a deadline already reached is kept as the end reason.
    pub fn stop(&self) {
        self.shared.end(EndReason::Stopped);
    }

    pub fn is_stopping(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }
}

/// A running session
///
/// Dropping the handle without [`join`](Self::join) stops the session but
/// does not wait for it.
pub struct SessionHandle {
    id: Uuid,
    started_at: DateTime<Utc>,
    shared: Arc<SessionShared>,
    workers: Vec<WorkerSlot>,
    deadline: Option<JoinHandle<()>>,
    sinks: SinkSet,
    output_file: Option<PathBuf>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Path of the session log, when saving
    pub fn output_file(&self) -> Option<&PathBuf> {
        self.output_file.as_ref()
    }

    pub fn stop(&self) {
        self.shared.end(EndReason::Stopped);
    }

    pub fn stopper(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current state of every worker, in interface order
    pub fn worker_states(&self) -> Vec<(String, WorkerState)> {
        self.workers
            .iter()
            .map(|slot| (slot.interface.clone(), slot.status.state()))
            .collect()
    }

    /// Packets dispatched so far across all interfaces
    pub fn packets_captured(&self) -> u64 {
        self.workers.iter().map(|slot| slot.status.packets()).sum()
    }

    /// Every worker thread has returned
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(|slot| slot.thread.is_finished())
    }

    /// Cancel and wait for the workers spawned so far, turning a spawn failure into an error
    fn abort(&mut self, e: std::io::Error) -> Error {
        error!(session = %self.id, error = %e, "Failed to spawn capture thread");
        self.shared.end(EndReason::Stopped);
        for slot in self.workers.drain(..) {
            let _ = slot.thread.join();
        }
        if let Some(deadline) = self.deadline.take() {
            let _ = deadline.join();
        }
        Error::Io(e)
    }

    /// Wait for every worker, finish the sinks and report
    pub fn join(mut self) -> Result<SessionReport> {
        let workers = std::mem::take(&mut self.workers);
        let mut interfaces = Vec::with_capacity(workers.len());
        for slot in workers {
            let report = match slot.thread.join() {
                Ok(report) => report,
                Err(_) => {
                    warn!(session = %self.id, interface = %slot.interface, "Capture worker panicked");
                    WorkerReport::panicked(slot.interface, slot.status.stats().snapshot(None))
                }
            };
            interfaces.push(report);
        }

        // Releases the deadline thread if it is still waiting
        self.shared.end(EndReason::Exhausted);
        if let Some(deadline) = self.deadline.take() {
            if deadline.join().is_err() {
                warn!(session = %self.id, "Deadline thread panicked");
            }
        }

        let finish_failures = self.sinks.finish_all().len() as u64;
        let sink_failures = interfaces
            .iter()
            .map(|report| report.stats.sink_failures)
            .sum::<u64>()
            + finish_failures;

        let report = SessionReport {
            id: self.id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            end_reason: self.shared.end_reason().unwrap_or(EndReason::Exhausted),
            interfaces,
            sink_failures,
            output_file: self.output_file.take(),
        };

        info!(
            session = %report.id,
            reason = %report.end_reason,
            packets = report.total_packets(),
            failures = report.failures().len(),
            "Capture session finished"
        );
        Ok(report)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shared.end(EndReason::Stopped);
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("workers", &self.worker_states())
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}

/// Outcome of a finished session
#[derive(Debug)]
pub struct SessionReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub end_reason: EndReason,
    /// One report per interface, in capture order
    pub interfaces: Vec<WorkerReport>,
    /// Records some sink rejected, plus sinks that failed to finish
    pub sink_failures: u64,
    pub output_file: Option<PathBuf>,
}

impl SessionReport {
    pub fn total_packets(&self) -> u64 {
        self.interfaces
            .iter()
            .map(|report| report.stats.packets_captured)
            .sum()
    }

    /// Worker-local failures with their interface
    pub fn failures(&self) -> Vec<(&str, &Error)> {
        self.interfaces
            .iter()
            .filter_map(|report| report.error.as_ref().map(|e| (report.interface.as_str(), e)))
            .collect()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Human-readable multi-line summary
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Session {} ({}): {} packets on {} interfaces in {:.2}s\n",
            self.id,
            self.end_reason,
            self.total_packets(),
            self.interfaces.len(),
            self.elapsed().num_milliseconds() as f64 / 1000.0
        );
        for report in &self.interfaces {
            match &report.error {
                Some(e) => out.push_str(&format!("  {}: failed: {}\n", report.interface, e)),
                None => out.push_str(&format!("  {}: {}\n", report.interface, report.stats.format())),
            }
        }
        if self.sink_failures > 0 {
            out.push_str(&format!("  sink failures: {}\n", self.sink_failures));
        }
        if let Some(path) = &self.output_file {
            out.push_str(&format!("  saved to {}\n", path.display()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{icmp_frame, tcp_frame, CountingSink, Ending, MemoryBackend, Script};
    use std::fs;
    use std::time::{Duration, Instant};

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.capture.poll_interval_ms = 10;
        settings
    }

    fn controller(backend: &Arc<MemoryBackend>) -> SessionController {
        SessionController::new(backend.clone())
    }

    fn counting() -> (Arc<CountingSink>, Vec<Arc<dyn Sink>>) {
        let sink = Arc::new(CountingSink::new("counting"));
        (sink.clone(), vec![sink as Arc<dyn Sink>])
    }

    #[test]
    fn test_deadline_bounds_continuous_capture() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add(
            "eth0",
            Script::frames(vec![tcp_frame(1), tcp_frame(2)]).ending(Ending::Repeat),
        );
        let (sink, sinks) = counting();

        let mut settings = settings();
        settings.duration_millis = 200;

        let start = Instant::now();
        let handle = controller(&backend).start(&settings, sinks).unwrap();
        let report = handle.join().unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(1200), "took {:?}", elapsed);
        assert_eq!(report.end_reason, EndReason::Deadline);
        assert!(sink.count() > 0);
        assert_eq!(report.total_packets(), sink.count() as u64);
        assert!(sink.is_finished());
        assert_eq!(backend.opened(), backend.closed());
    }

    #[test]
    fn test_per_interface_order_preserved() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add("eth0", Script::frames((1..=20).map(tcp_frame).collect()));
        backend.add("eth1", Script::frames((101..=120).map(tcp_frame).collect()));
        let (sink, sinks) = counting();

        let report = controller(&backend)
            .start(&settings(), sinks)
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(report.end_reason, EndReason::Exhausted);
        assert_eq!(report.total_packets(), 40);

        let records = sink.records();
        for (name, expected) in [("eth0", 1..=20u16), ("eth1", 101..=120u16)] {
            let ports: Vec<u16> = records
                .iter()
                .filter(|p| p.interface == name)
                .filter_map(|p| p.source_port)
                .collect();
            assert_eq!(ports, expected.collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_partial_failure_keeps_siblings() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add("a", Script::frames(vec![tcp_frame(1), tcp_frame(2)]));
        backend.add("b", Script::idle().fail_open("no permission"));
        backend.add("c", Script::frames(vec![tcp_frame(3)]));
        let (sink, sinks) = counting();

        let report = controller(&backend)
            .start(&settings(), sinks)
            .unwrap()
            .join()
            .unwrap();

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "b");
        assert!(matches!(failures[0].1, Error::InterfaceOpen { .. }));
        assert_eq!(sink.count(), 3);
        assert_eq!(backend.opened(), 2);
        assert_eq!(backend.closed(), 2);
        assert_eq!(report.end_reason, EndReason::Exhausted);
    }

    #[test]
    fn test_all_workers_failing_still_completes() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add("a", Script::idle().fail_open("busy"));
        backend.add("b", Script::idle().fail_open("busy"));

        let report = controller(&backend)
            .start(&settings(), Vec::new())
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(report.failures().len(), 2);
        assert_eq!(report.total_packets(), 0);
        assert_eq!(report.end_reason, EndReason::Exhausted);
    }

    #[test]
    fn test_filter_end_to_end() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add(
            "eth0",
            Script::frames(vec![tcp_frame(1000), icmp_frame(), tcp_frame(1001)]),
        );
        let (sink, sinks) = counting();

        let mut settings = settings();
        settings.protocols = vec!["tcp or udp".to_string()];

        let report = controller(&backend)
            .start(&settings, sinks)
            .unwrap()
            .join()
            .unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|p| p.protocol == "TCP"));
        assert_eq!(records[0].source_port, Some(1000));
        assert_eq!(records[1].source_port, Some(1001));
        assert_eq!(report.total_packets(), 2);
    }

    #[test]
    fn test_save_writes_one_block_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        backend.add("eth0", Script::frames((1..=4).map(tcp_frame).collect()));

        let mut settings = settings();
        settings.save = true;
        settings.output_dir = dir.path().to_path_buf();

        let handle = controller(&backend).start(&settings, Vec::new()).unwrap();
        let path = handle.output_file().cloned().unwrap();
        let report = handle.join().unwrap();

        assert_eq!(report.output_file.as_ref(), Some(&path));
        assert_eq!(path.parent(), Some(dir.path()));
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("Packet\t").count(), 4);
        assert!(contents.contains("\tInterface: eth0\n"));
        assert_eq!(report.sink_failures, 0);
    }

    #[test]
    fn test_stop_is_idempotent_and_prompt() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_idle("eth0");
        backend.add_idle("eth1");

        let handle = controller(&backend).start(&settings(), Vec::new()).unwrap();
        let stopper = handle.stopper();
        assert!(!handle.is_finished());
        assert!(!stopper.is_stopping());

        let start = Instant::now();
        stopper.stop();
        handle.stop();
        let report = handle.join().unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(report.end_reason, EndReason::Stopped);
        assert!(report
            .interfaces
            .iter()
            .all(|r| r.state == WorkerState::Closed));

        // Stopping a finished session does nothing
        stopper.stop();
        assert!(stopper.is_stopping());
        assert_eq!(backend.closed(), 2);
    }

    #[test]
    fn test_stop_after_deadline_keeps_deadline_reason() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_idle("eth0");

        let mut settings = settings();
        settings.duration_millis = 20;

        let handle = controller(&backend).start(&settings, Vec::new()).unwrap();
        let stopper = handle.stopper();
        while !stopper.is_stopping() {
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.stop();

        assert_eq!(handle.join().unwrap().end_reason, EndReason::Deadline);
    }

    #[test]
    fn test_invalid_filter_fails_before_enumeration() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_idle("eth0");
        backend.fail_enumeration("would have been called");

        let mut settings = settings();
        settings.protocols = vec!["tcp".to_string(), "gopher".to_string()];

        match controller(&backend).start(&settings, Vec::new()) {
            Err(Error::InvalidFilterSpec(token)) => assert_eq!(token, "gopher"),
            other => panic!("Expected InvalidFilterSpec, got {:?}", other.map(|h| h.id())),
        }
        assert_eq!(backend.opened(), 0);
    }

    #[test]
    fn test_enumeration_failures_are_session_fatal() {
        let backend = Arc::new(MemoryBackend::new());
        match controller(&backend).start(&settings(), Vec::new()) {
            Err(e @ Error::NoInterfacesAvailable) => assert!(e.is_session_fatal()),
            other => panic!("Expected NoInterfacesAvailable, got {:?}", other.map(|h| h.id())),
        }

        backend.fail_enumeration("pcap_findalldevs failed");
        match controller(&backend).start(&settings(), Vec::new()) {
            Err(e @ Error::Enumeration(_)) => assert!(e.is_session_fatal()),
            other => panic!("Expected Enumeration, got {:?}", other.map(|h| h.id())),
        }
    }

    #[test]
    fn test_unwritable_output_dir_is_session_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        backend.add_idle("eth0");

        let mut settings = settings();
        settings.save = true;
        settings.output_dir = dir.path().join("missing");

        assert!(matches!(
            controller(&backend).start(&settings, Vec::new()),
            Err(Error::OutputFile { .. })
        ));
        assert_eq!(backend.opened(), 0);
    }

    #[test]
    fn test_allow_list_limits_workers() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add("eth0", Script::frames(vec![tcp_frame(1)]));
        backend.add("eth1", Script::frames(vec![tcp_frame(2)]));

        let mut settings = settings();
        settings.interfaces = vec!["eth1".to_string()];

        let handle = controller(&backend).start(&settings, Vec::new()).unwrap();
        let names: Vec<String> = handle.worker_states().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["eth1"]);

        let report = handle.join().unwrap();
        assert_eq!(report.interfaces.len(), 1);
        assert_eq!(report.interfaces[0].interface, "eth1");
        assert!(report.summary().contains("eth1"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_idle("eth0");
        let mut settings = settings();
        settings.capture.snaplen = 0;

        assert!(matches!(
            controller(&backend).start(&settings, Vec::new()),
            Err(Error::Config(_))
        ));
    }
}
