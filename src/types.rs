//! Wire records and index/versioning types shared by the executor, the
//! endpoint clients and the watch engine.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::DecodeError;

/// Opaque version number the agent attaches to every read.
///
/// Equal indices mean "no content change". Header absence or a malformed
/// header value both map to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIndex(u64);

impl ResourceIndex {
    pub const ZERO: ResourceIndex = ResourceIndex(0);

    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses the decimal index header value.
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Self)
            .unwrap_or_default()
    }
}

impl From<u64> for ResourceIndex {
    fn from(index: u64) -> Self {
        Self(index)
    }
}

impl fmt::Display for ResourceIndex {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blocking parameters of a read.
///
/// A nonzero `wait_index` turns the read into a long poll held open until
/// the resource moves past that index or `wait_time` elapses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub wait_index: ResourceIndex,
    pub wait_time: Duration,
}

impl QueryOptions {
    pub fn blocking(
        wait_index: ResourceIndex,
        wait_time: Duration,
    ) -> Self {
        Self { wait_index, wait_time }
    }

    pub fn is_blocking(&self) -> bool {
        !self.wait_index.is_zero()
    }
}

/// Metadata returned alongside every query result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryMeta {
    pub last_index: ResourceIndex,
}

/// One instance of a service as listed by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogService {
    #[serde(rename = "ServiceID")]
    pub service_id: String,
    #[serde(rename = "ServiceName")]
    pub service_name: String,
    #[serde(rename = "ServiceAddress", default)]
    pub service_address: String,
    #[serde(rename = "ServicePort", default)]
    pub service_port: u16,
    #[serde(rename = "ServiceTags", default, deserialize_with = "null_as_default")]
    pub service_tags: Vec<String>,
    #[serde(rename = "CreateIndex", default)]
    pub create_index: u64,
    #[serde(rename = "ModifyIndex", default)]
    pub modify_index: u64,
}

/// TTL health check attached at registration time.
///
/// Both fields are agent duration strings such as `10s` or `1500ms`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentServiceCheck {
    #[serde(rename = "TTL")]
    pub ttl: String,
    #[serde(rename = "DeregisterCriticalServiceAfter")]
    pub deregister_critical_service_after: String,
}

/// Service descriptor sent to the local agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Tags", default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(rename = "Meta", default, deserialize_with = "null_as_default", skip_serializing_if = "HashMap::is_empty")]
    pub meta: HashMap<String, String>,
    #[serde(rename = "Check")]
    pub check: AgentServiceCheck,
}

impl AgentService {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_tags(
        mut self,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_meta(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Key-value entry.
///
/// `modify_index` doubles as the compare-and-swap token for writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KVPairWire", into = "KVPairWire")]
pub struct KVPair {
    pub key: String,
    pub value: Vec<u8>,
    pub flags: u64,
    pub lock_index: u64,
    pub create_index: u64,
    pub modify_index: u64,
}

impl KVPair {
    /// Value as UTF-8, lossily.
    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// JSON shape of a KV entry; `Value` is base64 or null.
#[derive(Debug, Serialize, Deserialize)]
struct KVPairWire {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value", default)]
    value: Option<String>,
    #[serde(rename = "Flags", default)]
    flags: u64,
    #[serde(rename = "LockIndex", default)]
    lock_index: u64,
    #[serde(rename = "CreateIndex", default)]
    create_index: u64,
    #[serde(rename = "ModifyIndex", default)]
    modify_index: u64,
}

impl TryFrom<KVPairWire> for KVPair {
    type Error = DecodeError;

    fn try_from(wire: KVPairWire) -> Result<Self, Self::Error> {
        let value = match wire.value {
            Some(encoded) => STANDARD.decode(encoded).map_err(|source| DecodeError::Base64 {
                key: wire.key.clone(),
                source,
            })?,
            None => Vec::new(),
        };
        Ok(KVPair {
            key: wire.key,
            value,
            flags: wire.flags,
            lock_index: wire.lock_index,
            create_index: wire.create_index,
            modify_index: wire.modify_index,
        })
    }
}

impl From<KVPair> for KVPairWire {
    fn from(pair: KVPair) -> Self {
        KVPairWire {
            key: pair.key,
            value: (!pair.value.is_empty()).then(|| STANDARD.encode(&pair.value)),
            flags: pair.flags,
            lock_index: pair.lock_index,
            create_index: pair.create_index,
            modify_index: pair.modify_index,
        }
    }
}

/// The agent encodes empty collections as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
