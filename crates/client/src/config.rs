//! Client configuration structures and loaders.
use std::env;

use pug_runtime::RuntimeConfig;

/// Configuration required to bootstrap the runtime and the terminal UI.
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    pub runtime: RuntimeConfig,
    pub messages: MessageConfig,
    pub session_id: Option<String>,
}

impl ClientConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Reads everything [`RuntimeConfig::from_env`] reads, plus:
    /// - `PUG_LOG_CAPACITY` - Message log capacity (default: 100)
    /// - `PUG_SESSION_ID` - Log directory name (default: timestamp)
    pub fn from_env() -> Self {
        let mut config = Self {
            runtime: RuntimeConfig::from_env(),
            ..Self::default()
        };

        if let Some(capacity) = read_env::<usize>("PUG_LOG_CAPACITY") {
            config.messages.capacity = capacity.max(1);
        }
        config.session_id = env::var("PUG_SESSION_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());

        config
    }
}

#[derive(Clone, Debug)]
pub struct MessageConfig {
    pub capacity: usize,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.trim().parse().ok()
}
