//! Pipeline log broadcasting.
//!
//! Every pipeline step logs through a process-wide broadcaster. Entries are
//! echoed to stderr, so stdout carries only command output, and streamed to
//! any connected SSE client (`GET /api/logs`).
//! Entries logged inside a render pass carry that pass's id.

use chrono::Utc;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Log level for frontend display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// RFC 3339 UTC
    pub timestamp: String,
    /// Render pass that emitted the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            pass_id: None,
        }
    }

    pub fn in_pass(mut self, pass_id: &str) -> Self {
        self.pass_id = Some(pass_id.to_string());
        self
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Fans log entries out to stdout and SSE subscribers
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Echo to stderr and broadcast an entry
    pub fn log(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        match entry.pass_id {
            Some(ref pass) => eprintln!("{} [{}] {}", prefix, &pass[..pass.len().min(8)], entry.message),
            None => eprintln!("{} {}", prefix, entry.message),
        }

        // No subscribers is fine
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Logger bound to one render pass.
#[derive(Debug, Clone)]
pub struct PassLog {
    pass_id: String,
}

impl PassLog {
    /// Start a pass with a fresh id.
    pub fn start() -> Self {
        Self {
            pass_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.pass_id
    }

    pub fn info(&self, msg: impl Into<String>) {
        LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).in_pass(&self.pass_id));
    }

    pub fn success(&self, msg: impl Into<String>) {
        LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg).in_pass(&self.pass_id));
    }

    pub fn warning(&self, msg: impl Into<String>) {
        LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg).in_pass(&self.pass_id));
    }

    pub fn error(&self, msg: impl Into<String>) {
        LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg).in_pass(&self.pass_id));
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}
