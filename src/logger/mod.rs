//! Logger module
//!
//! Logging for the asset server:
//! - Server lifecycle and index statistics
//! - Access logging with multiple formats
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::Level;

use crate::config::Config;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        Level::parse(&config.logging.level),
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(level: Level, message: &str) {
    match writer::get() {
        Some(w) => w.write_error(level, message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Asset server started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Serving: {}", config.assets.root));
    if config.assets.brotli {
        write_info("Codecs: br, gzip");
    } else {
        write_info("Codecs: gzip");
    }
    if let Some(ref fallback) = config.assets.fallback {
        write_info(&format!("Fallback asset: /{fallback}"));
    }
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_index_built(files: usize, total_bytes: u64, elapsed: Duration) {
    write_info(&format!(
        "[Index] {files} files, {total_bytes} bytes hashed in {}ms",
        elapsed.as_millis()
    ));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(Level::Error, &format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(Level::Warn, &format!("[WARN] {message}"));
}

pub fn log_shutdown() {
    write_info("[Shutdown] Signal received, no longer accepting connections");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    match writer::get() {
        Some(w) => w.write_access(&entry.format(format)),
        None => println!("{}", entry.format(format)),
    }
}
