//! Quarantine and audit trail for rejected uploads.
//!
//! Rejected bot files never reach the uploads directory: the original
//! bytes are moved into a quarantine directory and a structured entry is
//! appended to a JSONL audit log for later review. The log records who
//! submitted the file (network identity as reported by the gateway) and
//! the complete violation list.

use crate::vetter::SecurityViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One audit-log record for a rejected upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityLogEntry {
    /// When the rejection happened.
    pub timestamp: DateTime<Utc>,
    /// Network identity of the submitter (address or client id).
    pub submitter: String,
    /// The filename as uploaded.
    pub filename: String,
    /// Where the flagged bytes were quarantined.
    pub quarantine_path: PathBuf,
    /// The complete violation list, in source order.
    pub violations: Vec<SecurityViolation>,
}

/// Append-only security log plus quarantine storage.
pub struct SecurityLog {
    quarantine_dir: PathBuf,
    log_path: PathBuf,
    file: Mutex<File>,
}

impl SecurityLog {
    /// Opens (creating if needed) the quarantine directory and its
    /// `security_log.jsonl` audit file.
    pub fn open(quarantine_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(quarantine_dir)?;
        let log_path = quarantine_dir.join("security_log.jsonl");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        Ok(SecurityLog {
            quarantine_dir: quarantine_dir.to_path_buf(),
            log_path,
            file: Mutex::new(file),
        })
    }

    /// Quarantines a rejected upload and appends its audit entry.
    pub fn record(
        &self,
        filename: &str,
        submitter: &str,
        violations: &[SecurityViolation],
        content: &[u8],
    ) -> std::io::Result<SecurityLogEntry> {
        let timestamp = Utc::now();

        // timestamp prefix keeps repeated uploads of the same name apart
        let prefix = timestamp.format("%Y%m%dT%H%M%S%.9f");
        let quarantine_path = self
            .quarantine_dir
            .join(format!("{}_{}", prefix, sanitize(filename)));
        std::fs::write(&quarantine_path, content)?;

        let entry = SecurityLogEntry {
            timestamp,
            submitter: submitter.to_string(),
            filename: filename.to_string(),
            quarantine_path,
            violations: violations.to_vec(),
        };

        let line = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        {
            let mut file = self
                .file
                .lock()
                .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log lock poisoned"))?;
            writeln!(file, "{}", line)?;
        }

        tracing::warn!(
            filename,
            submitter,
            violations = violations.len(),
            "rejected bot upload quarantined"
        );
        Ok(entry)
    }

    /// Reads back every recorded entry, oldest first.
    pub fn entries(&self) -> std::io::Result<Vec<SecurityLogEntry>> {
        let file = File::open(&self.log_path)?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(error = %e, "skipping malformed security log line"),
            }
        }
        Ok(entries)
    }
}

/// Keeps quarantine filenames to a safe character set.
fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
