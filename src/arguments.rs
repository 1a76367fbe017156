/// Centralized argument handling for wshub
///
/// Command-line arguments are captured once and queried by the logger and
/// the debug helpers below, so any module can check a `--debug-<module>`
/// flag without threading parsed options through every call site.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions for the hub modules
/// - Override hook for binaries and tests
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

use crate::logger::{self, LogTag};

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by binaries and tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => {
            // Fallback to env::args if mutex is poisoned
            env::args().collect()
        }
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Hub registry debug mode
pub fn is_debug_registry_enabled() -> bool {
    has_arg("--debug-registry")
}

/// Per-room hub loop debug mode
pub fn is_debug_hub_enabled() -> bool {
    has_arg("--debug-hub")
}

/// Connection read/write loop debug mode
pub fn is_debug_connection_enabled() -> bool {
    has_arg("--debug-connection")
}

/// Ping/pong keepalive debug mode
pub fn is_debug_keepalive_enabled() -> bool {
    has_arg("--debug-keepalive")
}

/// Webserver debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Verbose mode for every module
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

/// Log which debug modes are active
pub fn print_debug_info() {
    let modes: Vec<&str> = [
        ("registry", is_debug_registry_enabled()),
        ("hub", is_debug_hub_enabled()),
        ("connection", is_debug_connection_enabled()),
        ("keepalive", is_debug_keepalive_enabled()),
        ("webserver", is_debug_webserver_enabled()),
        ("verbose", is_verbose_enabled()),
    ]
    .iter()
    .filter(|(_, enabled)| *enabled)
    .map(|(name, _)| *name)
    .collect();

    if !modes.is_empty() {
        logger::info(
            LogTag::System,
            &format!("Debug modes enabled: {}", modes.join(", ")),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_args_override_and_lookup() {
        let test_args = vec![
            "wshub".to_string(),
            "--debug-hub".to_string(),
            "--config".to_string(),
            "data/wshub.toml".to_string(),
        ];

        set_cmd_args(test_args.clone());
        assert_eq!(get_cmd_args(), test_args);

        assert!(has_arg("--debug-hub"));
        assert!(!has_arg("--debug-registry"));
        assert_eq!(get_arg_value("--config").as_deref(), Some("data/wshub.toml"));
        assert_eq!(get_arg_value("--debug-hub").as_deref(), Some("--config"));
        assert!(get_arg_value("data/wshub.toml").is_none());
    }
}
