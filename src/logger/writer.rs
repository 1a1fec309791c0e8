//! Log writer module
//!
//! Provides thread-safe log writing to files or stdout/stderr.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use super::format::{Level, LineFormat};

/// Global log writer instance
static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    /// Write to stdout
    Stdout,
    /// Write to stderr
    Stderr,
    /// Write to file
    File(Mutex<File>),
}

/// Thread-safe log writer
pub struct LogWriter {
    /// Info log target
    info: LogTarget,
    /// Error log target
    error: LogTarget,
    /// Lowest level that is written
    min_level: Level,
    /// Line layout
    format: LineFormat,
}

impl LogWriter {
    /// Create a new log writer with optional file paths
    fn new(
        info_log_file: Option<&str>,
        error_log_file: Option<&str>,
        min_level: Level,
        format: LineFormat,
    ) -> io::Result<Self> {
        let info = match info_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stdout,
        };

        let error = match error_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stderr,
        };

        Ok(Self {
            info,
            error,
            min_level,
            format,
        })
    }

    /// Whether records at `level` pass the configured threshold
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.min_level
    }

    pub const fn format(&self) -> LineFormat {
        self.format
    }

    /// Write a formatted line; errors and warnings go to the error target
    pub fn write_line(&self, level: Level, line: &str) {
        match level {
            Level::Error | Level::Warn => write_to_target(&self.error, line),
            Level::Info | Level::Debug => write_to_target(&self.info, line),
        }
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Write message to log target
fn write_to_target(target: &LogTarget, message: &str) {
    match target {
        LogTarget::Stdout => {
            println!("{message}");
        }
        LogTarget::Stderr => {
            eprintln!("{message}");
        }
        LogTarget::File(file) => {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{message}");
            }
        }
    }
}

/// Initialize the global log writer
///
/// This should be called once at application startup.
/// Returns error if log files cannot be opened or the writer is already set.
pub fn init(
    info_log_file: Option<&str>,
    error_log_file: Option<&str>,
    min_level: Level,
    format: LineFormat,
) -> io::Result<()> {
    let writer = LogWriter::new(info_log_file, error_log_file, min_level, format)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// Get the global log writer, if `init()` has been called
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}
