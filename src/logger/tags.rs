/// Log tags identifying the subsystem a message comes from
///
/// Each tag maps to a `--debug-<key>` flag that unlocks its debug output.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    Registry,
    Hub,
    Connection,
    Keepalive,
    Webserver,
    Config,
    System,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used in `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::Registry => "registry".to_string(),
            LogTag::Hub => "hub".to_string(),
            LogTag::Connection => "connection".to_string(),
            LogTag::Keepalive => "keepalive".to_string(),
            LogTag::Webserver => "webserver".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::System => "system".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(name) => name.to_lowercase().replace(' ', "-"),
        }
    }

    /// Uppercase label used in log lines
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Registry => "REGISTRY".to_string(),
            LogTag::Hub => "HUB".to_string(),
            LogTag::Connection => "CONN".to_string(),
            LogTag::Keepalive => "KEEPALIVE".to_string(),
            LogTag::Webserver => "WEBSERVER".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Test => "TEST".to_string(),
            LogTag::Other(name) => name.to_uppercase(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}
