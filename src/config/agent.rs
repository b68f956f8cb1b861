use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Local agent endpoint and HTTP client tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    /// Agent HTTP address; `http://` is assumed when no scheme is given
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Timeout for non-blocking requests in milliseconds.
    /// Blocking queries extend it by their wait time.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// Idle connections kept per host by the connection pool
    #[serde(default = "default_pool_idle_per_host")]
    pub pool_idle_per_host: usize,

    /// TCP keepalive in seconds
    #[serde(default = "default_tcp_keepalive")]
    pub tcp_keepalive_in_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
            pool_idle_per_host: default_pool_idle_per_host(),
            tcp_keepalive_in_secs: default_tcp_keepalive(),
        }
    }
}

impl AgentConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }

    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_secs(self.tcp_keepalive_in_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.trim().trim_matches('/').is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "agent address cannot be empty".into(),
            )));
        }

        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "agent connect timeout must be > 0".into(),
            )));
        }

        if self.request_timeout_in_ms < self.connect_timeout_in_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "agent request timeout {}ms must not be below connect timeout {}ms",
                self.request_timeout_in_ms, self.connect_timeout_in_ms
            ))));
        }

        Ok(())
    }
}

fn default_address() -> String {
    "http://127.0.0.1:8500".to_string()
}
fn default_connect_timeout() -> u64 {
    1000
}
fn default_request_timeout() -> u64 {
    10_000
}
fn default_pool_idle_per_host() -> usize {
    16
}
fn default_tcp_keepalive() -> u64 {
    30
}
