//! Session log file

use chrono::{DateTime, Local};
use snoop_core::{CapturedPacket, Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::RecordWriter;

/// Sink name used in logs and errors
pub const FILE_SINK_NAME: &str = "file";

/// Log file name for a session started at `started_at`
pub fn log_file_name(started_at: DateTime<Local>) -> String {
    started_at.format("%Y_%m_%d_%H_%M_%S.txt").to_string()
}

/// Text log of every record of one session
///
/// One block per record, each followed by an empty line. The file is
/// created when the session starts and closed by [`RecordWriter::finish`];
/// later writes fail.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    records: u64,
}

impl FileLog {
    /// Create the session log in `dir`
    ///
    /// A file left by another session started within the same second is
    /// never overwritten; a numeric suffix is appended instead.
    pub fn create(dir: &Path, started_at: DateTime<Local>) -> Result<Self> {
        let name = log_file_name(started_at);
        let stem = name.trim_end_matches(".txt");

        let mut attempt = 0u32;
        loop {
            let path = match attempt {
                0 => dir.join(&name),
                n => dir.join(format!("{}_{}.txt", stem, n)),
            };

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    info!(path = %path.display(), "Session log created");
                    return Ok(Self {
                        path,
                        writer: Some(BufWriter::new(file)),
                        records: 0,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 100 => {
                    attempt += 1;
                }
                Err(source) => return Err(Error::OutputFile { path, source }),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written so far
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

impl RecordWriter for FileLog {
    fn write_record(&mut self, packet: &CapturedPacket) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::sink_write(FILE_SINK_NAME, "session log already closed"))?;

        write!(writer, "{}", packet)
            .and_then(|_| writeln!(writer))
            .map_err(|e| Error::sink_write(FILE_SINK_NAME, e))?;
        self.records += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer
            .flush()
            .map_err(|e| Error::sink_write(FILE_SINK_NAME, e))?;
        debug!(path = %self.path.display(), records = self.records, "Session log closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_packet;
    use chrono::TimeZone;
    use std::fs;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 17, 9, 4, 33).unwrap()
    }

    #[test]
    fn test_file_name_from_start_time() {
        assert_eq!(log_file_name(started()), "2024_05_17_09_04_33.txt");
    }

    #[test]
    fn test_blocks_separated_by_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = FileLog::create(dir.path(), started()).unwrap();
        assert_eq!(log.path(), dir.path().join("2024_05_17_09_04_33.txt"));

        log.write_record(&sample_packet("eth0", "TCP")).unwrap();
        log.write_record(&sample_packet("eth0", "UDP")).unwrap();
        log.finish().unwrap();
        assert!(log.is_closed());
        assert_eq!(log.records(), 2);

        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.matches("Packet\t").count(), 2);

        let blocks: Vec<&str> = contents.split("\n\n").filter(|b| !b.is_empty()).collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("\tProtocol: TCP\t"));
        assert!(blocks[1].contains("\tProtocol: UDP\t"));
        assert!(contents.ends_with("\n\n"));
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = FileLog::create(dir.path(), started()).unwrap();
        log.finish().unwrap();
        log.finish().unwrap();

        match log.write_record(&sample_packet("eth0", "TCP")) {
            Err(Error::SinkWrite { sink, .. }) => assert_eq!(sink, FILE_SINK_NAME),
            other => panic!("Expected SinkWrite, got {:?}", other),
        }
    }

    #[test]
    fn test_existing_log_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileLog::create(dir.path(), started()).unwrap();
        let second = FileLog::create(dir.path(), started()).unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(
            second.path().file_name().and_then(|n| n.to_str()),
            Some("2024_05_17_09_04_33_1.txt")
        );
    }

    #[test]
    fn test_missing_directory_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does/not/exist");
        match FileLog::create(&missing, started()) {
            Err(e @ Error::OutputFile { .. }) => assert!(e.is_session_fatal()),
            other => panic!("Expected OutputFile, got {:?}", other.map(|l| l.path)),
        }
    }
}
