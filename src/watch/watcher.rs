use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::WatchEvent;
use super::Watchable;
use super::WatchedSnapshot;
use crate::BlockingQuery;
use crate::CatalogService;
use crate::Error;
use crate::HttpRequest;
use crate::KVPair;
use crate::QueryMeta;
use crate::QueryOptions;
use crate::ResourceIndex;
use crate::Result;
use crate::WatchConfig;
use crate::WATCH_EVENTS_METRIC;
use crate::WATCH_LAST_INDEX_METRIC;
use crate::WATCH_POLL_FAILURES_METRIC;

/// Turns successful reads of one resource into events.
pub trait WatchSource: Send {
    type Event: Send;

    /// Label used in logs and metrics
    const KIND: &'static str;

    /// Folds a read taken at `at` into the source's state.
    ///
    /// `body` is `None` when the resource does not exist (404).
    fn evaluate(
        &mut self,
        body: Option<&[u8]>,
        at: ResourceIndex,
    ) -> Result<Vec<Self::Event>>;

    fn event_kind(event: &Self::Event) -> &'static str;
}

/// List sources: every read replaces the whole list.
impl<T> WatchSource for WatchedSnapshot<T>
where
    T: Watchable + DeserializeOwned + Clone + Send + ListKind,
{
    type Event = WatchEvent<T>;

    const KIND: &'static str = T::KIND;

    fn evaluate(
        &mut self,
        body: Option<&[u8]>,
        at: ResourceIndex,
    ) -> Result<Vec<Self::Event>> {
        let current: Vec<T> = match body {
            Some(body) => serde_json::from_slice(body)?,
            None => Vec::new(),
        };
        Ok(self.diff(current, at))
    }

    fn event_kind(event: &Self::Event) -> &'static str {
        event.kind()
    }
}

/// Metric label of a watched list type
pub trait ListKind {
    const KIND: &'static str;
}

impl ListKind for CatalogService {
    const KIND: &'static str = "service";
}

impl ListKind for KVPair {
    const KIND: &'static str = "prefix";
}

/// Single-key source: reports the whole value whenever it differs from the
/// previous one. `None` means the key does not exist.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    previous: Option<Option<KVPair>>,
}

impl KeyState {
    /// Last value reported, if any read succeeded yet
    pub fn current(&self) -> Option<&Option<KVPair>> {
        self.previous.as_ref()
    }
}

impl WatchSource for KeyState {
    type Event = Option<KVPair>;

    const KIND: &'static str = "key";

    fn evaluate(
        &mut self,
        body: Option<&[u8]>,
        _at: ResourceIndex,
    ) -> Result<Vec<Self::Event>> {
        let value = match body {
            Some(body) => serde_json::from_slice::<Vec<KVPair>>(body)?.into_iter().next(),
            None => None,
        };
        if self.previous.as_ref() == Some(&value) {
            return Ok(Vec::new());
        }
        self.previous = Some(value.clone());
        Ok(vec![value])
    }

    fn event_kind(event: &Self::Event) -> &'static str {
        if event.is_some() {
            "update"
        } else {
            "delete"
        }
    }
}

pub type ServiceWatcher = Watcher<WatchedSnapshot<CatalogService>>;
pub type PrefixWatcher = Watcher<WatchedSnapshot<KVPair>>;
pub type KeyWatcher = Watcher<KeyState>;

/// Long-poll loop over one resource.
///
/// Owns the last index and the source state, so a stopped watcher can be
/// inspected or run again and resumes where it left off.
#[derive(Debug)]
pub struct Watcher<S: WatchSource> {
    query: BlockingQuery,
    request: HttpRequest,
    wait_time: Duration,
    retry_interval: Duration,
    last_index: ResourceIndex,
    primed: bool,
    source: S,
}

impl<S: WatchSource> Watcher<S> {
    pub fn new(
        query: BlockingQuery,
        request: HttpRequest,
        config: &WatchConfig,
        source: S,
    ) -> Self {
        Self {
            query,
            request,
            wait_time: config.wait_time(),
            retry_interval: config.retry_interval(),
            last_index: ResourceIndex::ZERO,
            primed: false,
            source,
        }
    }

    pub fn last_index(&self) -> ResourceIndex {
        self.last_index
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Polls until `cancel` fires or a non-retryable error occurs.
    ///
    /// Events reach `callback` in diff order. A callback error stops the loop
    /// and is returned as is. Transport and remote failures pause for the
    /// retry interval and poll again; decode failures end the loop.
    ///
    /// `last_index` never decreases: a read answered with a lower index is
    /// skipped, and the loop pauses before waiting on the last index again.
    pub async fn run<F>(
        &mut self,
        cancel: CancellationToken,
        mut callback: F,
    ) -> Result<()>
    where
        F: FnMut(S::Event) -> Result<()> + Send,
    {
        let path = self.request.path.clone();
        let mut wait_index = self.last_index;
        info!(kind = S::KIND, %path, %wait_index, "watch started");

        loop {
            let options = QueryOptions::blocking(wait_index, self.wait_time);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(kind = S::KIND, %path, "watch cancelled");
                    return Ok(());
                }
                result = self.poll(&options) => result,
            };

            let (body, meta) = match result {
                Ok(read) => read,
                Err(e) if e.is_retryable() => {
                    WATCH_POLL_FAILURES_METRIC.with_label_values(&[S::KIND]).inc();
                    wait_index = self.retry_index(&e);
                    warn!(
                        kind = S::KIND,
                        %path,
                        %wait_index,
                        "watch poll failed, retrying in {:?}: {}",
                        self.retry_interval,
                        e
                    );

                    if self.pause(&cancel).await {
                        info!(kind = S::KIND, %path, "watch cancelled during backoff");
                        return Ok(());
                    }
                    continue;
                }
                Err(e) => {
                    error!(kind = S::KIND, %path, "watch stopped: {}", e);
                    return Err(e);
                }
            };

            let new_index = meta.last_index;
            if self.primed && new_index == self.last_index {
                trace!(kind = S::KIND, %path, index = %new_index, "no change");
                wait_index = self.last_index;
                // without an index header every read returns at once
                if new_index.is_zero() && self.pause(&cancel).await {
                    info!(kind = S::KIND, %path, "watch cancelled during backoff");
                    return Ok(());
                }
                continue;
            }
            if self.primed && new_index < self.last_index {
                warn!(
                    kind = S::KIND,
                    %path,
                    "index went backwards from {} to {}, read skipped",
                    self.last_index,
                    new_index
                );
                wait_index = self.last_index;
                if self.pause(&cancel).await {
                    info!(kind = S::KIND, %path, "watch cancelled during backoff");
                    return Ok(());
                }
                continue;
            }

            self.last_index = new_index;
            self.primed = true;
            wait_index = new_index;
            WATCH_LAST_INDEX_METRIC
                .with_label_values(&[S::KIND])
                .set(gauge_value(new_index));

            let events = self.source.evaluate(body.as_deref(), new_index).inspect_err(|e| {
                error!(kind = S::KIND, %path, "watch stopped: {}", e);
            })?;
            debug!(kind = S::KIND, %path, index = %new_index, events = events.len(), "resource changed");

            for event in events {
                WATCH_EVENTS_METRIC
                    .with_label_values(&[S::KIND, S::event_kind(&event)])
                    .inc();
                callback(event)?;
            }
        }
    }

    /// Sleeps for the retry interval; true when cancelled first.
    async fn pause(
        &self,
        cancel: &CancellationToken,
    ) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(self.retry_interval) => false,
        }
    }

    async fn poll(
        &self,
        options: &QueryOptions,
    ) -> Result<(Option<Vec<u8>>, QueryMeta)> {
        match self.query.execute(self.request.clone(), options).await {
            Ok((body, meta)) => Ok((Some(body), meta)),
            Err(Error::Remote { status: 404, index, .. }) => Ok((None, QueryMeta { last_index: index })),
            Err(e) => Err(e),
        }
    }

    /// Index to wait on after a failed poll: the one carried by the error
    /// unless it lags behind what was already observed.
    fn retry_index(
        &self,
        e: &Error,
    ) -> ResourceIndex {
        match e.index() {
            Some(index) if index >= self.last_index => index,
            _ => self.last_index,
        }
    }
}

/// Index as a gauge sample, saturating above `i64::MAX`.
pub(crate) fn gauge_value(index: ResourceIndex) -> i64 {
    i64::try_from(index.get()).unwrap_or(i64::MAX)
}
