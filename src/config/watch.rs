use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Agents cap blocking queries at ten minutes
pub const MAX_WAIT_TIME_MS: u64 = 10 * 60 * 1000;

/// Blocking-query parameters shared by all watch loops
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// How long the agent may hold a blocking query open (milliseconds).
    /// Zero leaves the choice to the agent.
    #[serde(default = "default_wait_time")]
    pub wait_time_ms: u64,

    /// Fixed pause after a failed poll before polling again (milliseconds)
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            wait_time_ms: default_wait_time(),
            retry_interval_ms: default_retry_interval(),
        }
    }
}

impl WatchConfig {
    pub fn wait_time(&self) -> Duration {
        Duration::from_millis(self.wait_time_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.wait_time_ms > MAX_WAIT_TIME_MS {
            return Err(Error::Config(ConfigError::Message(format!(
                "watch wait time {}ms exceeds the agent maximum of {}ms",
                self.wait_time_ms, MAX_WAIT_TIME_MS
            ))));
        }

        if self.retry_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch retry interval must be > 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_wait_time() -> u64 {
    5 * 60 * 1000
}
fn default_retry_interval() -> u64 {
    1000
}
