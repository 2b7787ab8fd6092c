//! CLI argument parsing

use clap::{Parser, Subcommand};
use snoop_core::{Result, Settings};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snoop")]
#[command(version, about = "Multi-interface packet capture and classification", long_about = None)]
pub struct Cli {
    /// Capture only on this interface (repeatable; default: all)
    #[arg(short = 'I', long = "interface", value_name = "NAME")]
    pub interfaces: Vec<String>,

    /// Protocols to capture, e.g. "tcp or udp" or "tcp,icmp4" (default: all)
    #[arg(short = 'p', long, value_name = "PROTOCOLS")]
    pub protocols: Option<String>,

    /// Save every record to a session log file
    #[arg(short = 's', long)]
    pub save: bool,

    /// Directory for the session log file
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Stop after this many milliseconds (0 = until interrupted)
    #[arg(short = 't', long, value_name = "MILLIS")]
    pub duration_ms: Option<u64>,

    /// Open interfaces in promiscuous mode
    #[arg(short = 'P', long)]
    pub promiscuous: bool,

    /// JSON settings file; flags override its values
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum bytes captured per packet
    #[arg(long, value_name = "BYTES")]
    pub snaplen: Option<i32>,

    /// Read timeout in milliseconds; bounds stop latency
    #[arg(long = "poll-ms", value_name = "MILLIS")]
    pub poll_ms: Option<u64>,

    /// Do not print packets to the console
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Disable color output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List available network interfaces
    Interfaces,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log level for the verbosity count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Session settings: the config file if given, then flag overrides
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_json_file(path)?,
            None => Settings::default(),
        };

        if !self.interfaces.is_empty() {
            settings.interfaces = self.interfaces.clone();
        }
        if let Some(protocols) = &self.protocols {
            settings.protocols = vec![protocols.clone()];
        }
        if self.save {
            settings.save = true;
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(ms) = self.duration_ms {
            settings.duration_millis = ms;
        }
        if self.promiscuous {
            settings.promiscuous = true;
        }
        if let Some(snaplen) = self.snaplen {
            settings.capture.snaplen = snaplen;
        }
        if let Some(ms) = self.poll_ms {
            settings.capture.poll_interval_ms = ms;
        }

        settings.validate()?;
        Ok(settings)
    }
}
