//! Blocking query executor.
//!
//! One long-poll read: the agent holds the request open until the resource
//! moves past `wait_index` or `wait_time` elapses, then answers with the
//! current value and its index. The executor is stateless and never retries;
//! polling policy belongs to the watch loops.
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::duration::wait_param;
use crate::scoped_timer::ScopedTimer;
use crate::Error;
use crate::HttpRequest;
use crate::QueryMeta;
use crate::QueryOptions;
use crate::Result;
use crate::Transport;
use crate::QUERY_DURATION_METRIC;

/// Wait applied by the agent when a blocking query names no `wait`
pub const DEFAULT_SERVER_WAIT: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct BlockingQuery {
    transport: Arc<dyn Transport>,
    request_timeout: Duration,
}

impl BlockingQuery {
    pub fn new(
        transport: Arc<dyn Transport>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            request_timeout,
        }
    }

    /// HTTP timeout for a query with these options.
    ///
    /// The agent adds up to `wait / 16` of jitter to a blocking query, so the
    /// deadline covers the wait, the jitter and a normal request on top.
    pub fn timeout_for(
        &self,
        options: &QueryOptions,
    ) -> Duration {
        if !options.is_blocking() {
            return self.request_timeout;
        }
        let wait = if options.wait_time.is_zero() {
            DEFAULT_SERVER_WAIT
        } else {
            options.wait_time
        };
        wait + wait / 16 + self.request_timeout
    }

    /// Runs one read and returns the raw body with the new index.
    ///
    /// # Errors
    /// - `Error::Transport` when the agent could not be reached in time
    /// - `Error::Remote` for any non-2xx answer, carrying the index header of
    ///   that answer
    pub async fn execute(
        &self,
        request: HttpRequest,
        options: &QueryOptions,
    ) -> Result<(Vec<u8>, QueryMeta)> {
        let mut request = request.timeout(self.timeout_for(options));
        if !options.wait_index.is_zero() {
            request = request.param("index", options.wait_index.to_string());
        }
        if !options.wait_time.is_zero() {
            request = request.param("wait", wait_param(options.wait_time));
        }

        let kind = if options.is_blocking() { "blocking" } else { "immediate" };
        let timer = ScopedTimer::new("blocking_query");
        let path = request.path.clone();
        let result = self.transport.send(request).await;
        QUERY_DURATION_METRIC.with_label_values(&[kind]).observe(timer.elapsed_secs());

        let response = result?;
        if !response.is_success() {
            debug!(%path, status = response.status, index = %response.index, "query rejected");
            return Err(Error::remote(response.status, &response.body, response.index));
        }

        debug!(%path, wait_index = %options.wait_index, index = %response.index, "query returned");
        Ok((response.body, QueryMeta {
            last_index: response.index,
        }))
    }

    /// [`execute`](Self::execute) plus JSON decoding of the body.
    pub async fn query<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        options: &QueryOptions,
    ) -> Result<(T, QueryMeta)> {
        let (body, meta) = self.execute(request, options).await?;
        let value = serde_json::from_slice(&body)?;
        Ok((value, meta))
    }

    /// Like [`query`](Self::query), but an absent resource (404) is `None`
    /// and keeps the index of the 404 answer.
    pub async fn query_optional<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        options: &QueryOptions,
    ) -> Result<(Option<T>, QueryMeta)> {
        match self.query(request, options).await {
            Ok((value, meta)) => Ok((Some(value), meta)),
            Err(Error::Remote { status: 404, index, .. }) => Ok((None, QueryMeta { last_index: index })),
            Err(e) => Err(e),
        }
    }

    /// Single-shot request without blocking parameters.
    pub async fn call(
        &self,
        request: HttpRequest,
    ) -> Result<Vec<u8>> {
        let (body, _) = self.execute(request, &QueryOptions::default()).await?;
        Ok(body)
    }
}

impl std::fmt::Debug for BlockingQuery {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("BlockingQuery")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
