/// Core logging implementation with automatic filtering
///
/// Decides whether a message is displayed, then hands it to the format
/// module for rendering.
use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Check against minimum log level threshold
/// 3. Debug level requires --debug-<module> flag for that tag
/// 4. Verbose level requires --verbose flag OR --verbose-<module> flag for that tag
/// 5. If enabled_tags is non-empty, tag must be in the set
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    let config = get_logger_config();

    if level > config.min_level && !(level == LogLevel::Verbose && is_verbose_enabled_for_tag(tag))
    {
        return false;
    }

    if level == LogLevel::Debug {
        return is_debug_enabled_for_tag(tag);
    }

    if level == LogLevel::Verbose {
        return config.min_level == LogLevel::Verbose || is_verbose_enabled_for_tag(tag);
    }

    config.enabled_tags.is_empty() || config.enabled_tags.contains(&tag.to_debug_key())
}

/// Internal logging function with automatic filtering
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(&tag, level, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::config::{set_logger_config, LoggerConfig};

    #[test]
    fn test_should_log_filtering() {
        let mut config = LoggerConfig::default();
        config.min_level = LogLevel::Debug;
        config.debug_tags.insert("hub".to_string());
        set_logger_config(config);

        assert!(should_log(&LogTag::Connection, LogLevel::Error));
        assert!(should_log(&LogTag::Connection, LogLevel::Info));
        assert!(should_log(&LogTag::Hub, LogLevel::Debug));
        assert!(!should_log(&LogTag::Connection, LogLevel::Debug));
        assert!(!should_log(&LogTag::Hub, LogLevel::Verbose));
    }
}
