//! Packet capture pipeline for snoop
//!
//! This crate runs one capture worker per network interface, classifies
//! every frame into a [`CapturedPacket`](snoop_core::CapturedPacket) and fans
//! the records out to a set of sinks.
//!
//! ## Features
//!
//! - **Interface Management**: Enumerate devices and restrict a session to an allow-list
//! - **BPF Filters**: Protocol selections compiled once per session
//! - **Classification**: Protocol label, addresses and ports from the decoded layer stack
//! - **Sinks**: Live display feed, console lines and a per-session log file
//! - **Bounded Sessions**: Optional deadline, idempotent stop, prompt cancellation
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use snoop_capture::{ConsoleWriter, LockedSink, SessionController, Sink};
//! use snoop_core::Settings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut settings = Settings::default();
//! settings.protocols = vec!["tcp or udp".to_string()];
//! settings.duration_millis = 5_000;
//!
//! let console: Arc<dyn Sink> = Arc::new(LockedSink::new(
//!     "console",
//!     ConsoleWriter::new(std::io::stdout(), true),
//! ));
//!
//! let session = SessionController::pcap().start(&settings, vec![console])?;
//! let report = session.join()?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cancel;
pub mod capture;
pub mod classifier;
pub mod filters;
pub mod interface;
pub mod session;
pub mod sink;
pub mod stats;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use backend::{CaptureBackend, CaptureHandle, FrameEvent, OpenOptions, RawFrame};
pub use cancel::CancelToken;
pub use capture::{PcapBackend, PcapHandle};
pub use classifier::{protocol_label, Classifier, FrameMeta};
pub use filters::{CaptureFilter, FilterProtocol};
pub use interface::{resolve_interfaces, select_interfaces};
pub use session::{EndReason, SessionController, SessionHandle, SessionReport, StopHandle};
pub use sink::{ConsoleWriter, DisplayRow, FileLog, LockedSink, RecordWriter, RowFeed, Sink, SinkSet};
pub use stats::{CaptureStats, HandleStats, StatsAccumulator};
pub use worker::{CaptureWorker, WorkerExit, WorkerReport, WorkerState, WorkerStatus};
