//! Logger module
//!
//! Provides logging utilities for the render helpers including:
//! - Encode and template failures turned into 500 responses
//! - Pagination redirects
//! - Event stream termination
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::{Level, LineFormat, LogRecord};

use crate::config::LoggingConfig;

/// Initialize the logger with configuration
///
/// Should be called once at application startup. Until then records are
/// written to stdout/stderr in the plain format at `info` level.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    writer::init(
        config.info_log_file.as_deref(),
        config.error_log_file.as_deref(),
        Level::parse(&config.level),
        LineFormat::parse(&config.format),
    )
}

/// Write a record through the global writer, or the console before `init()`
fn emit(record: &LogRecord) {
    match writer::get() {
        Some(w) => {
            if w.enabled(record.level) {
                w.write_line(record.level, &record.format(w.format()));
            }
        }
        None => {
            if record.level > Level::Info {
                return;
            }
            let line = record.format(LineFormat::Plain);
            if record.level <= Level::Warn {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        }
    }
}

pub fn log_error(message: &str) {
    emit(&LogRecord::new(Level::Error, "render", message));
}

pub fn log_warning(message: &str) {
    emit(&LogRecord::new(Level::Warn, "render", message));
}

pub fn log_debug(target: &'static str, message: &str) {
    emit(&LogRecord::new(Level::Debug, target, message));
}

/// Log a value that could not be encoded or templated
pub fn log_render_failure(format: &str, status: u16, err: &impl std::fmt::Display) {
    emit(
        &LogRecord::new(Level::Error, "render", format!("failed to render {format}: {err}"))
            .with_status(status),
    );
}

pub fn log_redirect(from: &str, to: &str) {
    emit(
        &LogRecord::new(Level::Info, "pagination", format!("redirect {from} -> {to}"))
            .with_status(301),
    );
}

pub fn log_stream_end(events: usize, reason: &str) {
    emit(&LogRecord::new(
        Level::Debug,
        "stream",
        format!("event stream closed after {events} events: {reason}"),
    ));
}

pub fn log_skipped_header(name: &str, reason: &str) {
    emit(&LogRecord::new(
        Level::Warn,
        "params",
        format!("skipping header '{name}': {reason}"),
    ));
}
