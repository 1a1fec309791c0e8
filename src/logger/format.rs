//! Log line format module
//!
//! Supports two layouts:
//! - `plain`: `[time] LEVEL [target] message`
//! - `json`: one JSON object per line

use chrono::{DateTime, Local};
use serde::Serialize;

/// Severity of a log record, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    /// Parse a configured level name, falling back to `Info`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "debug" | "trace" => Self::Debug,
            _ => Self::Info,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

/// Layout of a written line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    Plain,
    Json,
}

impl LineFormat {
    pub fn parse(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Plain
        }
    }
}

/// A single log record
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Record timestamp
    pub time: DateTime<Local>,
    pub level: Level,
    /// Subsystem that produced the record (render, pagination, stream, ...)
    pub target: &'static str,
    pub message: String,
    /// Response status involved, if any
    pub status: Option<u16>,
}

impl LogRecord {
    /// Create a new record with current timestamp
    pub fn new(level: Level, target: &'static str, message: impl Into<String>) -> Self {
        Self {
            time: Local::now(),
            level,
            target,
            message: message.into(),
            status: None,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Format the record according to the specified layout
    pub fn format(&self, format: LineFormat) -> String {
        match format {
            LineFormat::Plain => self.format_plain(),
            LineFormat::Json => self.format_json(),
        }
    }

    fn format_plain(&self) -> String {
        let status = self
            .status
            .map(|s| format!(" status={s}"))
            .unwrap_or_default();
        format!(
            "[{}] {} [{}] {}{}",
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.level.as_str(),
            self.target,
            self.message,
            status,
        )
    }

    fn format_json(&self) -> String {
        let mut value = serde_json::json!({
            "time": self.time.to_rfc3339(),
            "level": self.level,
            "target": self.target,
            "message": self.message,
        });
        if let (Some(status), Some(map)) = (self.status, value.as_object_mut()) {
            map.insert("status".to_string(), status.into());
        }
        value.to_string()
    }
}
