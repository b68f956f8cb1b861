use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::AgentClient;
use super::CatalogClient;
use super::Client;
use super::KvClient;
use crate::BlockingQuery;
use crate::HttpTransport;
use crate::Result;
use crate::Settings;
use crate::Transport;

pub struct ClientBuilder {
    settings: Settings,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a new builder with default settings and the given agent address
    pub fn new(address: impl Into<String>) -> Self {
        let mut settings = Settings::default();
        settings.agent.address = address.into();
        Self {
            settings,
            transport: None,
        }
    }

    /// Set TCP connect timeout (default: 1s)
    pub fn connect_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.settings.agent.connect_timeout_in_ms = timeout.as_millis() as u64;
        self
    }

    /// Set timeout of non-blocking requests (default: 10s)
    pub fn request_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.settings.agent.request_timeout_in_ms = timeout.as_millis() as u64;
        self
    }

    /// Set how long watches let the agent hold a query (default: 5min)
    pub fn wait_time(
        mut self,
        wait: Duration,
    ) -> Self {
        self.settings.watch.wait_time_ms = wait.as_millis() as u64;
        self
    }

    /// Set the pause of watches after a failed poll (default: 1s)
    pub fn retry_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.settings.watch.retry_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Completely replaces the default settings
    ///
    /// # Warning: Configuration Override
    /// This discards the agent address passed to [`new`](ClientBuilder::new)
    /// and every value set through the granular methods before it.
    ///
    /// # Example
    /// ```ignore
    /// let settings = Settings::new()?.validate()?;
    /// let client = ClientBuilder::new("unused").set_settings(settings).build()?;
    /// ```
    pub fn set_settings(
        mut self,
        settings: Settings,
    ) -> Self {
        self.settings = settings;
        self
    }

    /// Use a custom transport instead of the HTTP one
    pub fn transport(
        mut self,
        transport: Arc<dyn Transport>,
    ) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate settings and build the client
    pub fn build(self) -> Result<Client> {
        let settings = self.settings.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&settings.agent)?),
        };
        debug!(address = %settings.agent.address, "building client");

        let query = BlockingQuery::new(transport, settings.agent.request_timeout());
        let settings = Arc::new(settings);
        Ok(Client {
            agent: AgentClient::new(query.clone()),
            catalog: CatalogClient::new(query.clone(), settings.clone()),
            kv: KvClient::new(query, settings.clone()),
            settings,
        })
    }
}
