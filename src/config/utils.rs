use super::schemas::Config;
/// Configuration utilities - loading and validation
///
/// The loaded `Config` is returned by value; callers wrap the hub section in
/// an `Arc` and hand it to the registry.
use crate::logger::{self, LogTag};

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/wshub.toml";

/// Load configuration from the default path
pub fn load_config() -> Result<Config, String> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific file path
///
/// A missing file yields the defaults. A file that exists but fails to
/// parse or validate is an error.
pub fn load_config_from_path(path: &str) -> Result<Config, String> {
    let config = if std::path::Path::new(path).exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

        toml::from_str::<Config>(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))?
    } else {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        Config::default()
    };

    config
        .validate()
        .map_err(|e| format!("Invalid config file '{}': {}", path, e))?;

    logger::debug(
        LogTag::Config,
        &format!(
            "Loaded config: read_timeout={}ms ping={}ms write_timeout={}ms max_message={}B",
            config.hub.read_timeout_ms,
            config.hub.ping_interval_ms,
            config.hub.write_timeout_ms,
            config.hub.max_message_size
        ),
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_from_path("/nonexistent/wshub.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_overrides_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[hub]\nread_timeout_ms = 2000\nping_interval_ms = 1500\n\n[server]\nport = 8081"
        )
        .unwrap();

        let config = load_config_from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.hub.read_timeout_ms, 2000);
        assert_eq!(config.hub.ping_interval_ms, 1500);
        assert_eq!(config.hub.max_message_size, 4096);
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hub]\nread_timeout_ms = 100\nping_interval_ms = 500").unwrap();

        let err = load_config_from_path(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.contains("ping_interval_ms"));
    }

    #[test]
    fn test_unparseable_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hub\nread_timeout_ms = ").unwrap();

        let err = load_config_from_path(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.starts_with("Failed to parse"));
    }
}
