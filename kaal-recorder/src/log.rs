//! The append-only session log and the message pools it is fed from.

use crate::common::EntryId;
use crate::error::{KaalError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Severity of a session log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Every severity, in the order random picks index into.
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single, immutable record in the session log.
///
/// Entries can only be created by [`SessionLog`], which guarantees their ids
/// are unique and increasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    id: EntryId,
    timestamp: String,
    recorded_at: Option<DateTime<Utc>>,
    message: String,
    severity: Severity,
}

impl LogEntry {
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Wall-clock time of creation, formatted `HH:MM:SS`.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The instant a live entry was generated. Seeded entries carry `None`.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.recorded_at
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<7} {}",
            self.timestamp,
            self.severity.as_str().to_uppercase(),
            self.message
        )
    }
}

/// An entry the log is seeded with before any recording happens.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub timestamp: String,
    pub message: String,
    pub severity: Severity,
}

/// The append-only, insertion-ordered session log.
#[derive(Debug, Clone)]
pub struct SessionLog {
    entries: Vec<LogEntry>,
    next_id: u64,
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Builds a log pre-filled with the given seed entries, in order.
    pub fn seeded<'a>(seeds: impl IntoIterator<Item = &'a SeedEntry>) -> Self {
        let mut log = Self::new();
        for seed in seeds {
            log.push(seed.timestamp.clone(), None, seed.message.clone(), seed.severity);
        }
        log
    }

    /// Appends a live entry stamped with `recorded_at`, formatted as `timestamp`.
    pub fn append(
        &mut self,
        timestamp: String,
        recorded_at: DateTime<Utc>,
        message: String,
        severity: Severity,
    ) -> &LogEntry {
        self.push(timestamp, Some(recorded_at), message, severity)
    }

    fn push(
        &mut self,
        timestamp: String,
        recorded_at: Option<DateTime<Utc>>,
        message: String,
        severity: Severity,
    ) -> &LogEntry {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(LogEntry {
            id,
            timestamp,
            recorded_at,
            message,
            severity,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Removes every entry. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// An owned copy of the log as it is right now.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.clone()
    }
}

/// The fixed message lists random entries are drawn from, one per severity.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePools {
    #[serde(default = "default_info_messages")]
    pub info: Vec<String>,
    #[serde(default = "default_warning_messages")]
    pub warning: Vec<String>,
    #[serde(default = "default_error_messages")]
    pub error: Vec<String>,
}

impl MessagePools {
    pub fn pool(&self, severity: Severity) -> &[String] {
        match severity {
            Severity::Info => &self.info,
            Severity::Warning => &self.warning,
            Severity::Error => &self.error,
        }
    }

    /// Every pool must hold at least one message for uniform picks to work.
    pub fn validate(&self) -> Result<()> {
        for severity in Severity::ALL {
            if self.pool(severity).is_empty() {
                return Err(KaalError::EmptyMessagePool(severity));
            }
        }
        Ok(())
    }
}

impl Default for MessagePools {
    fn default() -> Self {
        Self {
            info: default_info_messages(),
            warning: default_warning_messages(),
            error: default_error_messages(),
        }
    }
}

// --- Default value functions for serde ---

fn to_owned_all(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_info_messages() -> Vec<String> {
    to_owned_all(&[
        "Environment status updated",
        "User position recorded",
        "Audio zone activated",
        "New terrain chunk loaded",
    ])
}

fn default_warning_messages() -> Vec<String> {
    to_owned_all(&[
        "System resource usage high",
        "Network latency detected",
        "Render pipeline slowdown",
        "Audio sync delay detected",
    ])
}

fn default_error_messages() -> Vec<String> {
    to_owned_all(&[
        "Sensor data lost",
        "Device connection failed",
        "Memory allocation error",
        "Data stream interrupted",
    ])
}

pub(crate) fn default_seed_entries() -> Vec<SeedEntry> {
    vec![
        SeedEntry {
            timestamp: "10:15:22".to_string(),
            message: "Session initialized".to_string(),
            severity: Severity::Info,
        },
        SeedEntry {
            timestamp: "10:15:45".to_string(),
            message: "User tracking enabled".to_string(),
            severity: Severity::Info,
        },
        SeedEntry {
            timestamp: "10:16:12".to_string(),
            message: "Low system memory warning".to_string(),
            severity: Severity::Warning,
        },
    ]
}
