//! snoop core library
//!
//! This crate provides the shared types, settings and error handling for the
//! snoop capture-and-classification pipeline.

pub mod error;
pub mod interface;
pub mod packet;
pub mod settings;

// Re-export commonly used types
pub use error::{Error, Result};
pub use interface::{InterfaceAddress, InterfaceFlags, InterfaceInfo};
pub use packet::CapturedPacket;
pub use settings::{CaptureConfig, Settings};
