//! Error types for snoop

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for snoop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for snoop
///
/// Variants fall into three scopes: session-fatal (the session never starts),
/// worker-local (one interface stops, its siblings carry on) and sink-local
/// (one sink misses a record, capture continues).
#[derive(Error, Debug)]
pub enum Error {
    /// Protocol selection contains a name with no capture filter primitive
    #[error("Invalid filter specification: unrecognized protocol '{0}'")]
    InvalidFilterSpec(String),

    /// Enumeration returned no capture-capable interface
    #[error("No network interfaces available for capture")]
    NoInterfacesAvailable,

    /// The enumeration primitive itself failed
    #[error("Interface enumeration failed: {0}")]
    Enumeration(String),

    /// Session log file could not be created
    #[error("Cannot create output file '{}': {source}", path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid settings value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Capture handle could not be opened
    #[error("Failed to open interface '{interface}': {reason}")]
    InterfaceOpen { interface: String, reason: String },

    /// Compiled filter was rejected by the capture handle
    #[error("Failed to apply filter on '{interface}': {reason}")]
    FilterApply { interface: String, reason: String },

    /// Reading the next frame failed for a reason other than end of stream
    #[error("Read failure on '{interface}': {reason}")]
    Read { interface: String, reason: String },

    /// A capture worker thread panicked
    #[error("Capture worker for '{0}' panicked")]
    WorkerPanicked(String),

    /// A sink failed to accept or flush a record
    #[error("Sink '{sink}' write failure: {reason}")]
    SinkWrite { sink: String, reason: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration record could not be parsed
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a sink write error
    pub fn sink_write<S: Into<String>, R: ToString>(sink: S, reason: R) -> Self {
        Error::SinkWrite {
            sink: sink.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts the whole session rather than one worker or sink
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidFilterSpec(_)
                | Error::NoInterfacesAvailable
                | Error::Enumeration(_)
                | Error::OutputFile { .. }
                | Error::Config(_)
                | Error::Json(_)
        )
    }
}
