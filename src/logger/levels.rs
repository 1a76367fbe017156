/// Log level definitions for structured logging
///
/// Levels are ordered by severity (Error < Warning < Info < Debug < Verbose)
/// so filtering is a single comparison against the configured threshold.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,   // Always shown
    Warning = 1, // Evictions, dropped notifications
    Info = 2,    // Hub lifecycle, server startup (default threshold)
    Debug = 3,   // Gated by --debug-<module>
    Verbose = 4, // Gated by --verbose
}

impl LogLevel {
    /// Get string representation for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ERROR" => Some(LogLevel::Error),
            "WARNING" | "WARN" => Some(LogLevel::Warning),
            "INFO" => Some(LogLevel::Info),
            "DEBUG" => Some(LogLevel::Debug),
            "VERBOSE" | "TRACE" => Some(LogLevel::Verbose),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Verbose);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(LogLevel::parse("warn"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("Trace"), Some(LogLevel::Verbose));
        assert_eq!(LogLevel::parse("loud"), None);
    }
}
