//! Append-only activity log for connects, disconnects and relayed messages

use chrono::{DateTime, Local};
use log::error;
use std::fmt::{Display, Formatter};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Same layout as C's asctime(), without the trailing newline
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// A single timestamped record
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub text: String,
}

impl LogEntry {
    pub fn new(text: &str) -> Self {
        Self {
            timestamp: Local::now(),
            text: text.to_string(),
        }
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}]{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.text
        )?;
        if !self.text.ends_with('\n') {
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Activity sink backed by a text file and echoed to the console
///
/// The file is reopened in append mode for every record, so it is created
/// on demand and tolerates being rotated away between records.
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    /// Checks that the log file can be opened for appending before the
    /// server starts accepting clients.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timestamps and persists one line of activity
    ///
    /// Write failures are reported through the logger and otherwise
    /// ignored; losing a log line never stops the relay.
    pub fn record(&mut self, text: &str) {
        let entry = LogEntry::new(text);
        print!("{}", entry);

        if let Err(e) = self.append(&entry) {
            error!("Failed to write to {}: {}", self.path.display(), e);
        }
    }

    fn append(&self, entry: &LogEntry) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write!(file, "{}", entry)?;
        Ok(())
    }
}
