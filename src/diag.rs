//! Append-only diagnostic log.
//!
//! Each event is one line, `[YYYY-MM-DD HH:MM:SS] message`, stamped in local
//! time (UTC when the local offset cannot be determined). The file is opened
//! in append mode per event and is never truncated or rotated here.
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

pub const DEFAULT_LOG_FILE: &str = "abx_client.log";

#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    path: PathBuf,
}

impl DiagnosticLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    pub fn append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).ok();
            }
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open diagnostic log {:?}", self.path))?;
        writeln!(f, "[{}] {}", timestamp(), message).with_context(|| format!("write diagnostic log {:?}", self.path))?;
        Ok(())
    }

    /// Record an error event. Also echoed to stderr; a log write failure is
    /// reported there instead of being propagated.
    pub fn error(&self, message: &str) {
        eprintln!("error: {message}");
        if let Err(e) = self.append(message) {
            eprintln!("diagnostic log unavailable: {e:#}");
        }
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_FILE)
    }
}

/// Current local time as `YYYY-MM-DD HH:MM:SS`.
pub fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format_timestamp(now)
}

fn format_timestamp(t: OffsetDateTime) -> String {
    t.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_default()
}
