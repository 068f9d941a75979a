//! JSON Lines audit trail of sandbox launches
//!
//! The log file is opened before any restriction is applied; the already-open
//! descriptor stays writable once the ruleset is enforced, even if the log
//! directory is outside the allowed paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

use crate::error::SandboxError;
use crate::sandbox::SandboxReport;

/// Outcome of a launch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Enforced,
    Failed,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 timestamp
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub host: String,
    pub user: String,
    pub event: Event,
    /// Target command and its arguments
    pub command: Vec<String>,
    /// Landlock ABI, absent when the probe failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handled_access_fs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handled_access_net: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_rules: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_rules: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Audit logger that writes JSON Lines to a file
pub struct AuditLogger {
    session_id: String,
    host: String,
    user: String,
    writer: BufWriter<File>,
}

impl AuditLogger {
    /// Open `log_path` for appending, creating parent directories as needed
    pub fn new(log_path: &Path) -> Result<Self, String> {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create log directory: {}", e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|e| format!("Failed to open audit log '{}': {}", log_path.display(), e))?;

        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let user = users::get_current_username()
            .map(|u| u.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(AuditLogger {
            session_id: Uuid::new_v4().to_string(),
            host,
            user,
            writer: BufWriter::new(file),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn entry(&self, event: Event, command: &[OsString]) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            session_id: self.session_id.clone(),
            host: self.host.clone(),
            user: self.user.clone(),
            event,
            command: command
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
            abi: None,
            handled_access_fs: None,
            handled_access_net: None,
            fs_rules: None,
            net_rules: None,
            error: None,
        }
    }

    /// Record an enforced sandbox, right before the command is executed
    pub fn log_enforced(&mut self, report: &SandboxReport, command: &[OsString]) -> AuditEntry {
        let mut entry = self.entry(Event::Enforced, command);
        entry.abi = report.abi.map(|abi| abi.get());
        entry.handled_access_fs = Some(report.attr.handled_access_fs.bits());
        entry.handled_access_net = Some(report.attr.handled_access_net.bits());
        entry.fs_rules = Some(report.fs_rules);
        entry.net_rules = Some(report.net_rules);
        self.write_entry(&entry);
        entry
    }

    /// Record a launch that was aborted
    pub fn log_failure(&mut self, error: &SandboxError, command: &[OsString]) -> AuditEntry {
        let mut entry = self.entry(Event::Failed, command);
        entry.error = Some(error.to_string());
        self.write_entry(&entry);
        entry
    }

    fn write_entry(&mut self, entry: &AuditEntry) {
        if let Ok(json) = serde_json::to_string(entry) {
            let _ = writeln!(self.writer, "{}", json);
            let _ = self.writer.flush();
        }
    }
}
