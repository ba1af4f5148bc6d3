use super::FailureSink;
use crate::models::CaptionFailure;
use crate::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Writes one JSON line per failure to a plain text file.
///
/// The file is opened in append mode on the first record and the handle is
/// kept for later ones.
pub struct FileErrorLog {
    path: PathBuf,
    // Serializes appends so records from concurrent pipelines never interleave.
    file: Mutex<Option<File>>,
}

impl FileErrorLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, failure: &CaptionFailure) -> Result<()> {
        let mut line = serde_json::to_string(failure)?;
        line.push('\n');

        let mut guard = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let file = match guard.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?,
        };
        guard.insert(file).write_all(line.as_bytes())?;
        Ok(())
    }
}

impl FailureSink for FileErrorLog {
    fn record(&self, failure: &CaptionFailure) {
        if let Err(e) = self.append(failure) {
            tracing::error!(
                "Failed to write failure {} to {}: {}",
                failure.id,
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureCause;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn read_records(path: &Path) -> Vec<CaptionFailure> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_records_are_appended_as_lines() {
        let dir = TempDir::new().unwrap();
        let log = FileErrorLog::new(&dir.path().join("error_log.txt"));

        let first = CaptionFailure::new(
            FailureCause::MalformedOutput,
            "not JSON",
            Some("sorry,\nI can't help".to_string()),
        );
        let second = CaptionFailure::new(FailureCause::UpstreamError, "timeout", None);
        log.record(&first);
        log.record(&second);

        let records = read_records(log.path());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, first.id);
        assert_eq!(records[0].raw.as_deref(), Some("sorry,\nI can't help"));
        assert_eq!(records[1].cause, FailureCause::UpstreamError);
    }

    #[test]
    fn test_existing_content_is_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("error_log.txt");
        std::fs::write(&path, "previous line\n").unwrap();

        let log = FileErrorLog::new(&path);
        log.record(&CaptionFailure::new(FailureCause::SchemaViolation, "x", None));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("previous line\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_handle_is_reused_across_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("error_log.txt");
        let log = FileErrorLog::new(&path);

        log.record(&CaptionFailure::new(FailureCause::UpstreamError, "first", None));
        assert!(log.file.lock().unwrap().is_some());

        let moved = dir.path().join("rotated.txt");
        std::fs::rename(&path, &moved).unwrap();
        log.record(&CaptionFailure::new(FailureCause::UpstreamError, "second", None));

        assert!(!path.exists());
        let records = read_records(&moved);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].message, "second");
    }

    #[test]
    fn test_unwritable_path_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let log = FileErrorLog::new(&dir.path().join("missing").join("error_log.txt"));

        log.record(&CaptionFailure::new(FailureCause::UpstreamError, "x", None));
        assert!(!log.path().exists());
        assert!(log.file.lock().unwrap().is_none());
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(FileErrorLog::new(&dir.path().join("error_log.txt")));
        let raw = "x".repeat(64 * 1024);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = Arc::clone(&log);
                let raw = raw.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        log.record(&CaptionFailure::new(
                            FailureCause::MalformedOutput,
                            "bad",
                            Some(raw.clone()),
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = read_records(log.path());
        assert_eq!(records.len(), 40);
        assert!(records.iter().all(|r| r.raw.as_deref() == Some(raw.as_str())));
    }
}
