use std::sync::Arc;

use crate::BlockingQuery;
use crate::CatalogService;
use crate::HttpRequest;
use crate::QueryMeta;
use crate::QueryOptions;
use crate::Result;
use crate::ServiceWatcher;
use crate::Settings;
use crate::WatchedSnapshot;
use crate::Watcher;

/// Service discovery reads
#[derive(Debug, Clone)]
pub struct CatalogClient {
    query: BlockingQuery,
    settings: Arc<Settings>,
}

impl CatalogClient {
    pub(crate) fn new(
        query: BlockingQuery,
        settings: Arc<Settings>,
    ) -> Self {
        Self { query, settings }
    }

    /// Lists every instance of service `name`.
    ///
    /// With a nonzero `options.wait_index` the read blocks until the list
    /// moves past that index.
    pub async fn service(
        &self,
        name: &str,
        options: &QueryOptions,
    ) -> Result<(Vec<CatalogService>, QueryMeta)> {
        self.query.query(Self::service_request(name), options).await
    }

    /// Watch loop reporting instances of `name` as add/change/remove events
    pub fn watcher(
        &self,
        name: &str,
    ) -> ServiceWatcher {
        Watcher::new(
            self.query.clone(),
            Self::service_request(name),
            &self.settings.watch,
            WatchedSnapshot::new(),
        )
    }

    fn service_request(name: &str) -> HttpRequest {
        HttpRequest::get(format!("/v1/catalog/service/{name}"))
    }
}
