/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is defined using the config_struct! macro which provides:
/// - Single-source definition (no repetition)
/// - Embedded defaults
/// - Serde support
use crate::config_struct;
use std::time::Duration;

// ============================================================================
// HUB CONFIGURATION
// ============================================================================

config_struct! {
    /// Timeouts and queue sizes shared by every hub and connection
    pub struct HubConfig {
        /// Time allowed to write a single frame to a client
        write_timeout_ms: u64 = 10_000,

        /// Time allowed between pongs before a client is considered dead
        read_timeout_ms: u64 = 60_000,

        /// Ping period; must be strictly less than read_timeout_ms
        ping_interval_ms: u64 = 54_000,

        /// Largest inbound frame accepted from a client (bytes)
        max_message_size: usize = 4096,

        /// Per-room broadcast mailbox capacity
        broadcast_queue_size: usize = 256,

        /// Per-connection outbound mailbox capacity
        outbound_queue_size: usize = 256,
    }
}

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

config_struct! {
    /// Demo webserver configuration
    pub struct ServerConfig {
        host: String = "127.0.0.1".to_string(),
        port: u16 = 9997,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations
    pub struct Config {
        /// Hub and connection behaviour
        hub: HubConfig = HubConfig::default(),

        /// Webserver bind address
        server: ServerConfig = ServerConfig::default(),
    }
}

// ============================================================================
// IMPLEMENTATIONS
// ============================================================================

impl HubConfig {
    /// Build a config for the given read timeout with the ping period set to
    /// 90% of it
    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        let read_timeout_ms = read_timeout.as_millis() as u64;
        Self {
            read_timeout_ms,
            ping_interval_ms: read_timeout_ms * 9 / 10,
            ..Self::default()
        }
    }

    /// Validate hub configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.write_timeout_ms == 0 {
            return Err("write_timeout_ms must be > 0".to_string());
        }

        if self.read_timeout_ms == 0 {
            return Err("read_timeout_ms must be > 0".to_string());
        }

        if self.ping_interval_ms == 0 {
            return Err("ping_interval_ms must be > 0".to_string());
        }

        if self.ping_interval_ms >= self.read_timeout_ms {
            return Err(format!(
                "ping_interval_ms ({}) must be less than read_timeout_ms ({})",
                self.ping_interval_ms, self.read_timeout_ms
            ));
        }

        if self.max_message_size == 0 {
            return Err("max_message_size must be > 0".to_string());
        }

        if self.broadcast_queue_size == 0 {
            return Err("broadcast_queue_size must be > 0".to_string());
        }

        if self.outbound_queue_size == 0 {
            return Err("outbound_queue_size must be > 0".to_string());
        }

        Ok(())
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }
}

impl ServerConfig {
    /// Validate webserver configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("Host cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }

        Ok(())
    }

    /// Get the full bind address (host:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.hub.validate().map_err(|e| format!("[hub] {}", e))?;
        self.server.validate().map_err(|e| format!("[server] {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_defaults_match_documented_values() {
        let hub = HubConfig::default();
        assert_eq!(hub.write_timeout(), Duration::from_secs(10));
        assert_eq!(hub.read_timeout(), Duration::from_secs(60));
        assert_eq!(hub.ping_interval(), Duration::from_secs(54));
        assert_eq!(hub.max_message_size, 4096);
        assert_eq!(hub.broadcast_queue_size, 256);
        assert!(hub.validate().is_ok());
    }

    #[test]
    fn test_with_read_timeout_derives_ping_interval() {
        let hub = HubConfig::with_read_timeout(Duration::from_millis(200));
        assert_eq!(hub.ping_interval(), Duration::from_millis(180));
        assert!(hub.validate().is_ok());
    }

    #[test]
    fn test_ping_must_be_shorter_than_read_timeout() {
        let hub = HubConfig {
            read_timeout_ms: 1000,
            ping_interval_ms: 1000,
            ..HubConfig::default()
        };
        let err = hub.validate().unwrap_err();
        assert!(err.contains("ping_interval_ms"));
    }

    #[test]
    fn test_zero_queue_rejected() {
        let hub = HubConfig {
            outbound_queue_size: 0,
            ..HubConfig::default()
        };
        assert!(hub.validate().is_err());

        let config = Config {
            hub,
            server: ServerConfig::default(),
        };
        assert!(config.validate().unwrap_err().starts_with("[hub]"));
    }

    #[test]
    fn test_bind_address() {
        let server = ServerConfig::default();
        assert_eq!(server.bind_address(), "127.0.0.1:9997");
    }
}
