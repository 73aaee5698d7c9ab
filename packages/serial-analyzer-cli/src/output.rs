use chrono::{Local, TimeZone};
use serde::Serialize;
use serial_analyzer::TimestampedValue;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serialize `value` and print it, or write it to `path` when given
pub fn emit_json<T: Serialize>(value: &T, path: Option<&Path>, compact: bool) -> Result<(), String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .map_err(|e| format!("JSON serialization failed: {}", e))?;

    let written = match path {
        Some(path) => std::fs::write(path, format!("{}\n", json))
            .map_err(|e| (path.display().to_string(), e)),
        None => writeln!(std::io::stdout().lock(), "{}", json)
            .map_err(|e| ("stdout".to_string(), e)),
    };
    written.map_err(|(target, e)| format!("Failed to write {}: {}", target, e))
}

/// Render a unix timestamp the way `ctime` does, in local time
pub fn format_timestamp(timestamp: i64) -> String {
    match Local.timestamp_opt(timestamp, 0).single() {
        Some(time) => time.format("%a %b %e %H:%M:%S %Y").to_string(),
        None => timestamp.to_string(),
    }
}

/// Append-only log of `<time> , <value>` lines
pub struct SampleLog {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: u64,
}

impl SampleLog {
    pub fn create(path: &Path) -> Result<Self, String> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("Failed to open output file '{}': {}", path.display(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn append(&mut self, sample: TimestampedValue) -> Result<(), String> {
        writeln!(
            self.writer,
            "{} , {}",
            format_timestamp(sample.timestamp),
            sample.value
        )
        .and_then(|_| self.writer.flush())
        .map_err(|e| format!("Failed to write '{}': {}", self.path.display(), e))?;
        self.lines += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        emit_json(&vec![1, 2], Some(&path), true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1,2]\n");
    }

    #[test]
    fn test_format_timestamp_is_ctime_like() {
        let formatted = format_timestamp(0);
        // e.g. "Thu Jan  1 00:00:00 1970", shifted by the local offset
        assert_eq!(formatted.len(), 24);
        assert!(formatted.ends_with("1970") || formatted.ends_with("1969"));
    }

    #[test]
    fn test_sample_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MedianFilter.txt");

        let mut log = SampleLog::create(&path).unwrap();
        log.append(TimestampedValue::new(0, 2.5)).unwrap();
        log.append(TimestampedValue::new(1, 3.0)).unwrap();
        assert_eq!(log.lines(), 2);
        drop(log);

        let mut log = SampleLog::create(&path).unwrap();
        log.append(TimestampedValue::new(2, 4.0)).unwrap();
        drop(log);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" , 2.5"));
        assert!(lines[1].ends_with(" , 3"));
        assert!(lines[2].ends_with(" , 4"));
    }
}
