use std::time::Duration;

use tracing::debug;
use tracing::info;

use crate::duration::format_duration;
use crate::id::generate_service_id;
use crate::AgentService;
use crate::BlockingQuery;
use crate::HttpRequest;
use crate::Result;

/// Local agent endpoints: registration, deregistration and TTL reports
#[derive(Debug, Clone)]
pub struct AgentClient {
    query: BlockingQuery,
}

impl AgentClient {
    pub(crate) fn new(query: BlockingQuery) -> Self {
        Self { query }
    }

    /// Registers `service` with a TTL check and returns its id.
    ///
    /// An empty id is replaced by `<name>-<uuid v4>`. The agent marks the
    /// service critical when no report arrives within `ttl` and drops it
    /// after `deregister_after` in that state.
    ///
    /// # Errors
    /// - `Error::Transport` when the agent is unreachable
    /// - `Error::Remote` when the agent rejects the descriptor
    pub async fn register(
        &self,
        mut service: AgentService,
        ttl: Duration,
        deregister_after: Duration,
    ) -> Result<String> {
        if service.id.is_empty() {
            service.id = generate_service_id(&service.name);
        }
        service.check.ttl = format_duration(ttl);
        service.check.deregister_critical_service_after = format_duration(deregister_after);

        let body = serde_json::to_vec(&service)?;
        self.query
            .call(HttpRequest::put("/v1/agent/service/register").body(body))
            .await?;

        info!(id = %service.id, name = %service.name, ttl = %service.check.ttl, "service registered");
        Ok(service.id)
    }

    pub async fn deregister(
        &self,
        id: &str,
    ) -> Result<()> {
        self.query
            .call(HttpRequest::put(format!("/v1/agent/service/deregister/{id}")))
            .await?;
        info!(%id, "service deregistered");
        Ok(())
    }

    /// Marks TTL check `check_id` as passing with a free-text note.
    ///
    /// The check registered along with a service is `service:<id>`.
    pub async fn pass_ttl(
        &self,
        check_id: &str,
        note: &str,
    ) -> Result<()> {
        self.query
            .call(HttpRequest::put(format!("/v1/agent/check/pass/{check_id}")).param("note", note))
            .await?;
        debug!(%check_id, "ttl check passed");
        Ok(())
    }
}
