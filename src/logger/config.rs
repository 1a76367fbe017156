/// Logger configuration derived from command-line flags
///
/// The configuration lives in a process-wide RwLock so filtering can be
/// checked from any task without passing a handle around.
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::{get_cmd_args, has_arg};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Logger filter configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Maximum level that is printed (debug/verbose still need their flags)
    pub min_level: LogLevel,

    /// Tags with `--debug-<tag>` enabled
    pub debug_tags: HashSet<String>,

    /// Tags with `--verbose-<tag>` enabled
    pub verbose_tags: HashSet<String>,

    /// When non-empty, only these tags are printed (errors excepted)
    pub enabled_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Debug,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> = Lazy::new(|| RwLock::new(from_args()));

/// Get a copy of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Rebuild the configuration from the current command-line arguments
pub fn init_from_args() {
    set_logger_config(from_args());
}

fn from_args() -> LoggerConfig {
    let mut config = LoggerConfig::default();

    // --verbose lifts the threshold to everything, --quiet drops to warnings
    config.min_level = if has_arg("--verbose") {
        LogLevel::Verbose
    } else if has_arg("--quiet") {
        LogLevel::Warning
    } else {
        LogLevel::Debug
    };

    for arg in get_cmd_args() {
        if let Some(key) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(key.to_string());
        } else if let Some(key) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(key.to_string());
        }
    }

    config
}

/// True when `--debug-<tag>` was given for this tag
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(&tag.to_debug_key())
}

/// True when `--verbose-<tag>` was given for this tag
pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG
        .read()
        .verbose_tags
        .contains(&tag.to_debug_key())
}
