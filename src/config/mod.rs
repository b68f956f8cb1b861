//! Configuration management for the catalog client.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
mod agent;
mod heartbeat;
mod monitoring;
mod watch;
pub use agent::*;
pub use heartbeat::*;
pub use monitoring::*;
pub use watch::*;

use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "CONSUL_CONFIG_PATH";

/// Prefix of environment overrides, e.g. `CONSUL__AGENT__ADDRESS`
pub const ENV_PREFIX: &str = "CONSUL";

/// Main configuration container
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONSUL_CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Agent endpoint and HTTP client parameters
    #[serde(default)]
    pub agent: AgentConfig,
    /// Blocking-query and backoff parameters of watch loops
    #[serde(default)]
    pub watch: WatchConfig,
    /// TTL check parameters for registered services
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    /// Metrics exporter of the binary
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Settings {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONSUL__AGENT__ADDRESS", "10.0.0.5:8500");
    /// let settings = Settings::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let settings: Self = builder.add_source(env_source()).build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Applies additional overrides from file without validation.
    ///
    /// Environment variables are re-applied on top so they keep the highest
    /// priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.agent.validate()?;
        self.watch.validate()?;
        self.heartbeat.validate()?;
        self.monitoring.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
