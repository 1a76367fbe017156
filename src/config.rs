/// Configuration system for wshub
///
/// - `macros`: the `config_struct!` macro (struct + embedded defaults)
/// - `schemas`: every configuration structure, defined once
/// - `utils`: loading from TOML and validation
///
/// Configuration is an immutable value built once at startup and handed to
/// the hub registry; nothing reads it through a global.
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{Config, HubConfig, ServerConfig};
pub use utils::{load_config, load_config_from_path, CONFIG_FILE_PATH};
