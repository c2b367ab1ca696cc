//! # Audit Log
//!
//! Every build leaves a trail of short, tagged, timestamped lines
//! (`[14:02:11] AUTO-IMPORT | Collected dependency: numpy`).
//! Lines are kept in memory for the lifetime of the process and mirrored to the `log` facade
//! so they also show up on the console. On request the whole trail is dumped to
//! `logs/build_log_<YYYYMMDD_HHMMSS>.txt`.

use std::fmt;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use chrono::Local;
use log::{error, info};

/// Category of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditTag {
    Ingest,
    Config,
    Process,
    Cleanup,
    AutoImport,
    Command,
    Success,
    Error,
    Failure,
}

impl fmt::Display for AuditTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditTag::Ingest => "INGEST",
            AuditTag::Config => "CONFIG",
            AuditTag::Process => "PROCESS",
            AuditTag::Cleanup => "CLEANUP",
            AuditTag::AutoImport => "AUTO-IMPORT",
            AuditTag::Command => "COMMAND",
            AuditTag::Success => "SUCCESS",
            AuditTag::Error => "ERROR",
            AuditTag::Failure => "FAILURE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Default)]
pub struct AuditLog {
    lines: Vec<String>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record, stamped with the local wall-clock time.
    pub fn record(&mut self, tag: AuditTag, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        match tag {
            AuditTag::Error | AuditTag::Failure => error!("{} | {}", tag, msg),
            _ => info!("{} | {}", tag, msg),
        }

        let ts = Local::now().format("%H:%M:%S");
        self.lines.push(format!("[{}] {} | {}", ts, tag, msg));
    }

    #[allow(dead_code)]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Writes the trail into `logs_dir`.
    ///
    /// Returns `Ok(None)` without touching the disk when nothing has been recorded.
    pub fn export(&self, logs_dir: &Path) -> Result<Option<PathBuf>> {
        let data = self.lines.join("\n");
        if data.trim().is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(logs_dir)
            .with_context(|| format!("Failed to create logs directory {:?}", logs_dir))?;

        let ts = Local::now().format("%Y%m%d_%H%M%S");
        let file = logs_dir.join(format!("build_log_{}.txt", ts));
        std::fs::write(&file, data)
            .with_context(|| format!("Failed to write build log {:?}", file))?;

        info!("Build log exported to {:?}", file);
        Ok(Some(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_format() {
        let mut log = AuditLog::new();
        log.record(AuditTag::AutoImport, "Collected dependency: numpy");

        let line = &log.lines()[0];
        // [HH:MM:SS] is 10 chars
        assert_eq!(&line[0..1], "[");
        assert_eq!(&line[9..10], "]");
        assert!(line.ends_with("AUTO-IMPORT | Collected dependency: numpy"));
    }

    #[test]
    fn test_export_empty_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new();
        assert!(log.export(dir.path()).unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_export_writes_all_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = AuditLog::new();
        log.record(AuditTag::Process, "Compilation started (Standard)");
        log.record(AuditTag::Failure, "Compilation error: exit code 1");

        let file = log.export(&dir.path().join("logs")).unwrap().unwrap();
        let name = file.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("build_log_"));
        assert!(name.ends_with(".txt"));
        // build_log_ + YYYYMMDD_HHMMSS + .txt
        assert_eq!(name.len(), "build_log_".len() + 15 + ".txt".len());

        let content = std::fs::read_to_string(&file).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("PROCESS | Compilation started (Standard)"));
        assert!(content.contains("FAILURE | Compilation error"));
    }
}
