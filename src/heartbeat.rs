//! TTL heartbeat scheduler.
//!
//! Keeps a registered service's TTL check passing: one report right away,
//! then one per interval, until cancelled. The first failed report ends the
//! loop; the agent then lets the TTL run out on its own.
use std::time::Duration;

use config::ConfigError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::AgentClient;
use crate::Error;
use crate::Result;
use crate::HEARTBEAT_REPORTS_METRIC;

#[derive(Debug, Clone)]
pub struct Heartbeat {
    agent: AgentClient,
    note: String,
}

impl Heartbeat {
    pub fn new(
        agent: AgentClient,
        note: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            note: note.into(),
        }
    }

    /// Reports `service:<service_id>` as passing every `interval`.
    ///
    /// Returns `Ok(())` once `cancel` fires; the service stays registered.
    ///
    /// # Errors
    /// The error of the first failed report; no retry is attempted.
    pub async fn run(
        &self,
        service_id: &str,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::Config(ConfigError::Message(
                "heartbeat interval must be > 0".into(),
            )));
        }

        let check_id = format!("service:{service_id}");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(%check_id, ?interval, "heartbeat started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(%check_id, "heartbeat cancelled");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let report = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(%check_id, "heartbeat cancelled during report");
                    return Ok(());
                }
                report = self.agent.pass_ttl(&check_id, &self.note) => report,
            };
            if let Err(e) = report {
                HEARTBEAT_REPORTS_METRIC.with_label_values(&["failed"]).inc();
                error!(%check_id, "heartbeat stopped: {}", e);
                return Err(e);
            }
            HEARTBEAT_REPORTS_METRIC.with_label_values(&["ok"]).inc();
            debug!(%check_id, "heartbeat reported");
        }
    }
}
