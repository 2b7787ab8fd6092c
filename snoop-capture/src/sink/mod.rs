//! Record consumers and fan-out
//!
//! Every classified record is offered to every [`Sink`] of the session in
//! capture order. A sink that rejects a record is logged and counted; it
//! never stops delivery to the other sinks or the capture itself.
//!
//! Sinks are shared by all workers, so [`Sink::accept`] takes `&self`.
//! Writers that are not safe to call concurrently implement
//! [`RecordWriter`] and are wrapped in a [`LockedSink`], which serializes
//! them behind one lock per sink instance.

pub mod console;
pub mod display;
pub mod file;

pub use console::ConsoleWriter;
pub use display::{DisplayRow, RowFeed};
pub use file::FileLog;

use parking_lot::Mutex;
use snoop_core::{CapturedPacket, Error, Result};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Consumer of classified records
pub trait Sink: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Take one record; called concurrently from every worker
    fn accept(&self, packet: Arc<CapturedPacket>) -> Result<()>;

    /// Flush and release resources once every worker has stopped
    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// A single-threaded record writer
pub trait RecordWriter: Send {
    fn write_record(&mut self, packet: &CapturedPacket) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink adapter holding its writer behind a mutex
pub struct LockedSink<W> {
    name: String,
    writer: Mutex<W>,
}

impl<W: RecordWriter> LockedSink<W> {
    pub fn new<S: Into<String>>(name: S, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Run `f` with exclusive access to the writer
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.writer.lock())
    }
}

impl<W: RecordWriter> Sink for LockedSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept(&self, packet: Arc<CapturedPacket>) -> Result<()> {
        self.writer.lock().write_record(&packet)
    }

    fn finish(&self) -> Result<()> {
        self.writer.lock().finish()
    }
}

impl<W> fmt::Debug for LockedSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedSink").field("name", &self.name).finish()
    }
}

/// Shared fan-out over the sinks of one session
#[derive(Clone, Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn Sink>>,
}

impl SinkSet {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Offer one record to every sink; returns how many rejected it
    pub fn dispatch(&self, packet: Arc<CapturedPacket>) -> usize {
        let mut failures = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.accept(Arc::clone(&packet)) {
                failures += 1;
                warn!(
                    sink = sink.name(),
                    interface = %packet.interface,
                    error = %e,
                    "Sink rejected record"
                );
            }
        }
        failures
    }

    /// Finish every sink, collecting the failures
    pub fn finish_all(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.finish() {
                warn!(sink = sink.name(), error = %e, "Sink failed to finish");
                errors.push(e);
            }
        }
        errors
    }
}

impl fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
