use std::path::PathBuf;
use std::time::Duration;

/// Configuration consumed at connection-pool construction time (spec §4.1).
///
/// Mirrors the teacher's `client::Config` (`src/client/config.rs`) in shape
/// — named fields, `Duration` timeouts, plain struct rather than a URL —
/// but scoped to what an administrative connection needs.
#[derive(Debug, Clone)]
pub struct Options {
    pub connection_timeout: Duration,
    pub client_name: String,
    pub rename_commands_file: Option<PathBuf>,
    pub password: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            connection_timeout: Duration::from_secs(5),
            client_name: String::new(),
            rename_commands_file: None,
            password: None,
        }
    }
}
