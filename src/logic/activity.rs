//! Activity Feed
//!
//! In-memory log behind the console `log` command. Every line is mirrored
//! to the `log` crate, so stderr shows the same stream.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_ACTIVITY_LINES, PRUNE_KEEP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityLine {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug)]
pub struct ActivityLog {
    lines: RwLock<Vec<ActivityLine>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        ActivityLog {
            lines: RwLock::new(Vec::new()),
        }
    }

    pub fn info<S: Into<String>>(&self, message: S) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn warn<S: Into<String>>(&self, message: S) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn error<S: Into<String>>(&self, message: S) {
        self.push(LogLevel::Error, message.into());
    }

    fn push(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => log::info!("{message}"),
            LogLevel::Warn => log::warn!("{message}"),
            LogLevel::Error => log::error!("{message}"),
        }

        let mut lines = self.lines.write();
        lines.push(ActivityLine {
            timestamp: Utc::now(),
            level,
            message,
        });
        if lines.len() > MAX_ACTIVITY_LINES {
            let excess = lines.len() - PRUNE_KEEP;
            lines.drain(0..excess);
        }
    }

    /// Console clear: wipe the feed and confirm into the fresh log.
    pub fn clear(&self) {
        self.wipe();
        self.info("log cleared");
        self.info("system ready");
    }

    /// Silent wipe, used by the system reset before the welcome banner.
    pub fn wipe(&self) {
        self.lines.write().clear();
    }

    pub fn line_count(&self) -> usize {
        self.lines.read().len()
    }

    /// Assertion helper for the operation tests.
    #[cfg(test)]
    pub fn warn_count(&self) -> usize {
        self.lines
            .read()
            .iter()
            .filter(|l| l.level == LogLevel::Warn)
            .count()
    }

    pub fn snapshot(&self, limit: usize) -> Vec<ActivityLine> {
        let lines = self.lines.read();
        let start = lines.len().saturating_sub(limit);
        lines[start..].to_vec()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
