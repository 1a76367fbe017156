//! Structured logging system for wshub
//!
//! This module provides a small, ergonomic logging API with:
//! - Automatic debug mode filtering from command-line arguments
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Colored console output with aligned tags
//!
//! ## Usage
//!
//! ```rust
//! use wshub::logger::{self, LogTag};
//!
//! logger::error(LogTag::Connection, "Write failed");
//! logger::warning(LogTag::Hub, "Connection evicted (outbound queue full)");
//! logger::info(LogTag::Registry, "Hub created");
//! logger::debug(LogTag::Hub, "Fan-out details: ..."); // Only if --debug-hub
//! logger::verbose(LogTag::Keepalive, "Ping sent"); // Only if --verbose
//! ```
//!
//! ## Initialization
//!
//! Call once at startup, after `arguments::set_cmd_args` if the binary
//! overrides arguments:
//! ```rust
//! wshub::logger::init();
//! ```

mod config;
mod core;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Scans command-line arguments for `--debug-<module>`, `--verbose` and
/// `--quiet` and installs the resulting filter configuration.
pub fn init() {
    config::init_from_args();
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues)
///
/// Warnings are shown by default (unless --quiet is used).
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics)
///
/// Debug logs are ONLY shown when the --debug-<module> flag matching the
/// tag is provided.
///
/// # Example
/// ```rust
/// use wshub::logger::{self, LogTag};
///
/// // Only shown with --debug-hub flag
/// logger::debug(LogTag::Hub, "Fan-out issued to 3 connections");
/// ```
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing)
///
/// Verbose logs are ONLY shown when --verbose flag is provided.
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}
