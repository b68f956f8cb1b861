//! Client module for the local catalog agent
//!
//! Provides the components an application talks to:
//! - [`Client`] - Main entry point sharing one transport
//! - [`ClientBuilder`] - Configurable client construction
//! - [`AgentClient`] - Service registration and TTL reports
//! - [`CatalogClient`] - Service discovery reads and watches
//! - [`KvClient`] - Key-value reads, writes, compare-and-swap and watches
//!
//! # Basic Usage
//! ```no_run
//! use catalog_watch::AgentService;
//! use catalog_watch::Client;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = Client::builder("127.0.0.1:8500")
//!         .request_timeout(Duration::from_secs(3))
//!         .build()
//!         .unwrap();
//!
//!     let service = AgentService::new("web", "10.0.0.1", 8080);
//!     let id = client
//!         .agent()
//!         .register(service, Duration::from_secs(10), Duration::from_secs(60))
//!         .await
//!         .unwrap();
//!
//!     let cancel = CancellationToken::new();
//!     let heartbeat = client.heartbeat();
//!     let token = cancel.clone();
//!     tokio::spawn(async move { heartbeat.run(&id, Duration::from_secs(9), token).await });
//!
//!     client.kv().put("config/web/color", "blue").await.unwrap();
//!
//!     let mut watcher = client.catalog().watcher("web");
//!     watcher
//!         .run(cancel, |event| {
//!             println!("{} {}", event.kind(), event.id());
//!             Ok(())
//!         })
//!         .await
//!         .unwrap();
//! }
//! ```

mod agent;
mod builder;
mod catalog;
mod kv;

pub use agent::*;
pub use builder::*;
pub use catalog::*;
pub use kv::*;


use std::sync::Arc;

use crate::Heartbeat;
use crate::Settings;

/// Main entry point for interacting with the agent
///
/// Cloning is cheap; every clone shares the same connection pool.
/// Created through the [`builder()`](Client::builder) method
#[derive(Debug, Clone)]
pub struct Client {
    pub(super) agent: AgentClient,
    pub(super) catalog: CatalogClient,
    pub(super) kv: KvClient,
    pub(super) settings: Arc<Settings>,
}

impl Client {
    /// Start a builder against the agent at `address`
    pub fn builder(address: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(address)
    }

    pub fn agent(&self) -> &AgentClient {
        &self.agent
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn kv(&self) -> &KvClient {
        &self.kv
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// TTL reporter using the configured heartbeat note
    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat::new(self.agent.clone(), self.settings.heartbeat.note.clone())
    }
}
