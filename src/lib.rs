//! Client for Consul-style service catalogs.
//!
//! Registers services with TTL checks and keeps them alive, reads and writes
//! a key-value store with compare-and-swap, and turns the agent's blocking
//! queries into ordered change notifications.
mod client;
mod config;
mod errors;
mod heartbeat;
mod metrics;
mod network;
mod query;
mod types;
mod watch;
pub mod utils;

pub use client::*;
pub use self::config::*;
pub use errors::*;
pub use heartbeat::*;
pub use metrics::*;
pub use network::*;
pub use query::*;
pub use types::*;
pub use utils::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils
