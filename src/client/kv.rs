use std::sync::Arc;

use tracing::debug;

use crate::net::kv_path;
use crate::BlockingQuery;
use crate::HttpRequest;
use crate::KVPair;
use crate::KeyState;
use crate::KeyWatcher;
use crate::PrefixWatcher;
use crate::QueryMeta;
use crate::QueryOptions;
use crate::Result;
use crate::Settings;
use crate::WatchedSnapshot;
use crate::Watcher;

/// Key-value store client interface
///
/// Keys are relative to the store root; a leading `/` is ignored. Each
/// entry's `modify_index` is the token for [`cas`](KvClient::cas).
#[derive(Debug, Clone)]
pub struct KvClient {
    query: BlockingQuery,
    settings: Arc<Settings>,
}

impl KvClient {
    pub(crate) fn new(
        query: BlockingQuery,
        settings: Arc<Settings>,
    ) -> Self {
        Self { query, settings }
    }

    /// Reads one key
    ///
    /// # Returns
    /// - `Ok((Some(pair), meta))` if the key exists
    /// - `Ok((None, meta))` if it does not; `meta` still carries the index
    pub async fn get(
        &self,
        key: &str,
        options: &QueryOptions,
    ) -> Result<(Option<KVPair>, QueryMeta)> {
        let (pairs, meta) = self
            .query
            .query_optional::<Vec<KVPair>>(HttpRequest::get(kv_path(key)), options)
            .await?;
        Ok((pairs.and_then(|pairs| pairs.into_iter().next()), meta))
    }

    /// Reads every key under `prefix`; an empty prefix yields an empty list
    pub async fn list(
        &self,
        prefix: &str,
        options: &QueryOptions,
    ) -> Result<(Vec<KVPair>, QueryMeta)> {
        let (pairs, meta) = self
            .query
            .query_optional::<Vec<KVPair>>(Self::list_request(prefix), options)
            .await?;
        Ok((pairs.unwrap_or_default(), meta))
    }

    /// Unconditional write. Returns the agent's acknowledgement.
    pub async fn put(
        &self,
        key: &str,
        value: impl AsRef<[u8]>,
    ) -> Result<bool> {
        self.write(HttpRequest::put(kv_path(key)), value).await
    }

    /// Writes only if the key's current modify index equals `index`.
    ///
    /// Index `0` writes only if the key does not exist yet. Returns `false`,
    /// leaving the stored value untouched, when the index is stale.
    pub async fn cas(
        &self,
        key: &str,
        value: impl AsRef<[u8]>,
        index: u64,
    ) -> Result<bool> {
        let request = HttpRequest::put(kv_path(key)).param("cas", index.to_string());
        self.write(request, value).await
    }

    /// Watch loop reporting the whole value of `key` whenever it changes
    pub fn watch_key(
        &self,
        key: &str,
    ) -> KeyWatcher {
        Watcher::new(
            self.query.clone(),
            HttpRequest::get(kv_path(key)),
            &self.settings.watch,
            KeyState::default(),
        )
    }

    /// Watch loop reporting keys under `prefix` as add/change/remove events
    pub fn watch_prefix(
        &self,
        prefix: &str,
    ) -> PrefixWatcher {
        Watcher::new(
            self.query.clone(),
            Self::list_request(prefix),
            &self.settings.watch,
            WatchedSnapshot::new(),
        )
    }

    fn list_request(prefix: &str) -> HttpRequest {
        HttpRequest::get(kv_path(prefix)).flag("recurse")
    }

    async fn write(
        &self,
        request: HttpRequest,
        value: impl AsRef<[u8]>,
    ) -> Result<bool> {
        let path = request.path.clone();
        let body = self.query.call(request.body(value.as_ref().to_vec())).await?;
        let applied: bool = serde_json::from_slice(&body)?;
        debug!(%path, applied, "kv write");
        Ok(applied)
    }
}
