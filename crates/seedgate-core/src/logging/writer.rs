//! Append-only JSONL log files.
//!
//! Each run writes `<logs_dir>/<date>_<instance>.jsonl`. Lines are flushed as
//! they are written so a crash loses at most the line in flight.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::entry::LogEntry;

/// Appends entries to one instance's log file.
pub struct LogWriter {
    instance: String,
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl LogWriter {
    /// Open (or create) today's file for `instance` under `logs_dir`.
    pub fn new(logs_dir: impl AsRef<Path>, instance: impl Into<String>) -> std::io::Result<Self> {
        let instance = instance.into();
        let logs_dir = logs_dir.as_ref();
        fs::create_dir_all(logs_dir)?;

        let date = chrono::Local::now().format("%Y-%m-%d");
        let path = logs_dir.join(format!("{date}_{instance}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            instance,
            writer: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line.
    pub fn write(&self, entry: &LogEntry) -> std::io::Result<()> {
        let json = entry
            .to_json_line()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut writer = self.writer.lock();
        writeln!(writer, "{json}")?;
        writer.flush()
    }

    pub fn flush(&self) -> std::io::Result<()> {
        self.writer.lock().flush()
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Read every `.jsonl` file in `logs_dir`, sorted by timestamp.
///
/// Unparseable lines are skipped.
pub fn read_entries(logs_dir: impl AsRef<Path>) -> std::io::Result<Vec<LogEntry>> {
    let logs_dir = logs_dir.as_ref();
    if !logs_dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for dir_entry in fs::read_dir(logs_dir)? {
        let path = dir_entry?.path();
        if path.extension().map(|e| e == "jsonl").unwrap_or(false) {
            let content = fs::read_to_string(&path)?;
            entries.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .filter_map(|line| LogEntry::from_json_line(line).ok()),
            );
        }
    }

    entries.sort_by(|a, b| a.ts.cmp(&b.ts));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writer_creates_file() {
        let temp = TempDir::new().unwrap();
        let logs_dir = temp.path().join("logs");

        let writer = LogWriter::new(&logs_dir, "cli").unwrap();
        assert!(writer.path().exists());
        assert!(writer.path().to_string_lossy().ends_with("_cli.jsonl"));
    }

    #[test]
    fn test_read_entries_across_instances() {
        let temp = TempDir::new().unwrap();
        let a = LogWriter::new(temp.path(), "a").unwrap();
        let b = LogWriter::new(temp.path(), "b").unwrap();

        a.write(&LogEntry::new("info", "a", "t", "first")).unwrap();
        b.write(&LogEntry::new("warn", "b", "t", "second")).unwrap();
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let entries = read_entries(temp.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.instance == "a"));
        assert!(entries.iter().any(|e| e.level == "warn"));
    }

    #[test]
    fn test_read_entries_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(read_entries(temp.path().join("nope")).unwrap().is_empty());
    }
}
