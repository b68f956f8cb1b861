use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// TTL check parameters used when registering and keeping services alive
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HeartbeatConfig {
    /// Check TTL: the agent marks the service critical when no report
    /// arrives within this window (milliseconds)
    #[serde(default = "default_ttl")]
    pub ttl_ms: u64,

    /// Period between liveness reports (milliseconds); must be below the TTL
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// The agent removes a service that stayed critical this long (milliseconds)
    #[serde(default = "default_deregister_critical_after")]
    pub deregister_critical_after_ms: u64,

    /// Free-text note attached to every report
    #[serde(default = "default_note")]
    pub note: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl(),
            interval_ms: default_interval(),
            deregister_critical_after_ms: default_deregister_critical_after(),
            note: default_note(),
        }
    }
}

impl HeartbeatConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn deregister_critical_after(&self) -> Duration {
        Duration::from_millis(self.deregister_critical_after_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "heartbeat interval must be > 0".into(),
            )));
        }

        if self.interval_ms >= self.ttl_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "heartbeat interval {}ms must be shorter than ttl {}ms",
                self.interval_ms, self.ttl_ms
            ))));
        }

        if self.deregister_critical_after_ms < self.ttl_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "deregister_critical_after {}ms must not be below ttl {}ms",
                self.deregister_critical_after_ms, self.ttl_ms
            ))));
        }

        Ok(())
    }
}

fn default_ttl() -> u64 {
    10_000
}
fn default_interval() -> u64 {
    9_000
}
fn default_deregister_critical_after() -> u64 {
    60_000
}
fn default_note() -> String {
    "keepalive".to_string()
}
