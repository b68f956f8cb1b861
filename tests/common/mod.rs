//! In-memory stand-in for the agent's `/v1` HTTP API.
//!
//! Serves the catalog, TTL checks and the KV store with blocking-query
//! semantics: reads carrying `index` are held until the table index moves
//! past it or `wait` elapses. Every answer carries `X-Consul-Index`.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use catalog_watch::AgentService;
use catalog_watch::Client;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::sync::watch;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::Filter;
use warp::Reply;

pub const INDEX_HEADER: &str = "X-Consul-Index";

#[derive(Debug, Clone)]
pub struct KvRecord {
    pub value: Vec<u8>,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Debug, Clone)]
pub struct ServiceRecord {
    pub service: AgentService,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Debug, Default)]
pub struct AgentState {
    index: u64,
    catalog_index: u64,
    kv_index: u64,
    services: BTreeMap<String, ServiceRecord>,
    kv: BTreeMap<String, KvRecord>,
    passes: HashMap<String, Vec<String>>,
    failing_reads: usize,
}

impl AgentState {
    fn next_index(&mut self) -> u64 {
        self.index += 1;
        self.index
    }
}

#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<AgentState>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Shared {
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut AgentState) -> R,
    ) -> R {
        let result = f(&mut self.state.lock());
        let index = self.state.lock().index;
        self.changes.send_replace(index);
        result
    }

    /// Holds a blocking read until `table` moves past `wait_index`
    async fn block_on(
        &self,
        params: &HashMap<String, String>,
        table: fn(&AgentState) -> u64,
    ) {
        let wait_index: u64 = params.get("index").and_then(|v| v.parse().ok()).unwrap_or(0);
        if wait_index == 0 {
            return;
        }
        let wait = params
            .get("wait")
            .and_then(|v| v.strip_suffix("ms"))
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(300));

        let mut rx = self.changes.subscribe();
        let deadline = tokio::time::sleep(wait);
        tokio::pin!(deadline);
        loop {
            if table(&self.state.lock()) > wait_index {
                return;
            }
            tokio::select! {
                _ = &mut deadline => return,
                changed = rx.changed() => if changed.is_err() { return },
            }
        }
    }

    fn take_failure(&self) -> bool {
        let mut state = self.state.lock();
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            true
        } else {
            false
        }
    }
}

pub struct FakeAgent {
    pub addr: SocketAddr,
    shared: Shared,
    shutdown: Option<oneshot::Sender<()>>,
}

impl FakeAgent {
    pub async fn start() -> Self {
        let (changes, _) = watch::channel(0);
        let shared = Shared {
            state: Arc::new(Mutex::new(AgentState::default())),
            changes: Arc::new(changes),
        };
        let (tx, rx) = oneshot::channel::<()>();
        let (addr, server) =
            warp::serve(routes(shared.clone())).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async {
                rx.await.ok();
            });
        tokio::spawn(server);

        Self {
            addr,
            shared,
            shutdown: Some(tx),
        }
    }

    pub fn client(&self) -> Client {
        Client::builder(self.addr.to_string())
            .wait_time(Duration::from_secs(2))
            .retry_interval(Duration::from_millis(50))
            .build()
            .expect("client builds")
    }

    pub fn kv_value(
        &self,
        key: &str,
    ) -> Option<KvRecord> {
        self.shared.state.lock().kv.get(key).cloned()
    }

    pub fn set_kv(
        &self,
        key: &str,
        value: &str,
    ) -> u64 {
        self.shared.mutate(|state| put_kv(state, key, value.as_bytes().to_vec()))
    }

    pub fn delete_kv(
        &self,
        key: &str,
    ) {
        self.shared.mutate(|state| {
            let index = state.next_index();
            state.kv.remove(key);
            state.kv_index = index;
        });
    }

    pub fn passes(
        &self,
        check_id: &str,
    ) -> Vec<String> {
        self.shared.state.lock().passes.get(check_id).cloned().unwrap_or_default()
    }

    pub fn service(
        &self,
        id: &str,
    ) -> Option<ServiceRecord> {
        self.shared.state.lock().services.get(id).cloned()
    }

    /// Answers the next `n` catalog and KV reads with a 500 that carries no
    /// index
    pub fn fail_reads(
        &self,
        n: usize,
    ) {
        self.shared.state.lock().failing_reads = n;
    }
}

impl Drop for FakeAgent {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn put_kv(
    state: &mut AgentState,
    key: &str,
    value: Vec<u8>,
) -> u64 {
    let index = state.next_index();
    let create_index = state.kv.get(key).map(|r| r.create_index).unwrap_or(index);
    state.kv.insert(
        key.to_string(),
        KvRecord {
            value,
            create_index,
            modify_index: index,
        },
    );
    state.kv_index = index;
    index
}

fn with_index(
    reply: impl Reply,
    status: StatusCode,
    index: u64,
) -> Response {
    warp::reply::with_header(warp::reply::with_status(reply, status), INDEX_HEADER, index.to_string()).into_response()
}

fn routes(shared: Shared) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    let with_shared = {
        let shared = shared.clone();
        warp::any().map(move || shared.clone())
    };
    let params = warp::query::<HashMap<String, String>>();

    let catalog = warp::get()
        .and(warp::path!("v1" / "catalog" / "service" / String))
        .and(params.clone())
        .and(with_shared.clone())
        .and_then(catalog_service);

    let register = warp::put()
        .and(warp::path!("v1" / "agent" / "service" / "register"))
        .and(warp::body::bytes())
        .and(with_shared.clone())
        .and_then(register_service);

    let deregister = warp::put()
        .and(warp::path!("v1" / "agent" / "service" / "deregister" / String))
        .and(with_shared.clone())
        .and_then(deregister_service);

    let pass = warp::put()
        .and(warp::path!("v1" / "agent" / "check" / "pass" / String))
        .and(params.clone())
        .and(with_shared.clone())
        .and_then(pass_check);

    let kv_get = warp::get()
        .and(warp::path("v1"))
        .and(warp::path("kv"))
        .and(warp::path::tail())
        .and(params.clone())
        .and(with_shared.clone())
        .and_then(|tail: warp::path::Tail, params, shared| kv_get(tail.as_str().to_string(), params, shared));

    let kv_put = warp::put()
        .and(warp::path("v1"))
        .and(warp::path("kv"))
        .and(warp::path::tail())
        .and(params)
        .and(warp::body::bytes())
        .and(with_shared)
        .and_then(|tail: warp::path::Tail, params, body, shared| {
            kv_put(tail.as_str().to_string(), params, body, shared)
        });

    catalog
        .or(register)
        .unify()
        .or(deregister)
        .unify()
        .or(pass)
        .unify()
        .or(kv_get)
        .unify()
        .or(kv_put)
        .unify()
}

async fn catalog_service(
    name: String,
    params: HashMap<String, String>,
    shared: Shared,
) -> Result<Response, Infallible> {
    shared.block_on(&params, |s| s.catalog_index).await;
    if shared.take_failure() {
        return Ok(with_index("No cluster leader", StatusCode::INTERNAL_SERVER_ERROR, 0));
    }

    let state = shared.state.lock();

    let body: Vec<_> = state
        .services
        .values()
        .filter(|r| r.service.name == name)
        .map(|r| {
            json!({
                "Node": "fake",
                "ServiceID": r.service.id,
                "ServiceName": r.service.name,
                "ServiceAddress": r.service.address,
                "ServicePort": r.service.port,
                "ServiceTags": if r.service.tags.is_empty() { None } else { Some(&r.service.tags) },
                "CreateIndex": r.create_index,
                "ModifyIndex": r.modify_index,
            })
        })
        .collect();
    Ok(with_index(warp::reply::json(&body), StatusCode::OK, state.catalog_index))
}

async fn register_service(
    body: Bytes,
    shared: Shared,
) -> Result<Response, Infallible> {
    let service: AgentService = match serde_json::from_slice(&body) {
        Ok(service) => service,
        Err(e) => return Ok(with_index(format!("Request decode failed: {e}"), StatusCode::BAD_REQUEST, 0)),
    };
    if service.check.ttl.is_empty() || service.check.ttl.starts_with('0') {
        return Ok(with_index("Invalid check: TTL must be > 0", StatusCode::BAD_REQUEST, 0));
    }

    shared.mutate(|state| {
        let index = state.next_index();
        let create_index = state.services.get(&service.id).map(|r| r.create_index).unwrap_or(index);
        state.services.insert(
            service.id.clone(),
            ServiceRecord {
                service,
                create_index,
                modify_index: index,
            },
        );
        state.catalog_index = index;
    });
    Ok(with_index("", StatusCode::OK, 0))
}

async fn deregister_service(
    id: String,
    shared: Shared,
) -> Result<Response, Infallible> {
    let removed = shared.mutate(|state| {
        let index = state.next_index();
        let removed = state.services.remove(&id).is_some();
        if removed {
            state.catalog_index = index;
        }
        removed
    });
    if removed {
        Ok(with_index("", StatusCode::OK, 0))
    } else {
        Ok(with_index(format!("Unknown service ID {id:?}"), StatusCode::NOT_FOUND, 0))
    }
}

async fn pass_check(
    check_id: String,
    params: HashMap<String, String>,
    shared: Shared,
) -> Result<Response, Infallible> {
    let mut state = shared.state.lock();
    let known = check_id
        .strip_prefix("service:")
        .is_some_and(|id| state.services.contains_key(id));
    if !known {
        return Ok(with_index(
            format!("CheckID {check_id:?} does not have associated TTL"),
            StatusCode::INTERNAL_SERVER_ERROR,
            0,
        ));
    }
    let note = params.get("note").cloned().unwrap_or_default();
    state.passes.entry(check_id).or_default().push(note);
    Ok(with_index("", StatusCode::OK, 0))
}

async fn kv_get(
    key: String,
    params: HashMap<String, String>,
    shared: Shared,
) -> Result<Response, Infallible> {
    shared.block_on(&params, |s| s.kv_index).await;
    if shared.take_failure() {
        return Ok(with_index("No cluster leader", StatusCode::INTERNAL_SERVER_ERROR, 0));
    }

    let state = shared.state.lock();
    let recurse = params.contains_key("recurse");
    let body: Vec<_> = state
        .kv
        .iter()
        .filter(|(k, _)| if recurse { k.starts_with(&key) } else { **k == key })
        .map(|(k, r)| {
            json!({
                "Key": k,
                "Value": STANDARD.encode(&r.value),
                "Flags": 0,
                "LockIndex": 0,
                "CreateIndex": r.create_index,
                "ModifyIndex": r.modify_index,
            })
        })
        .collect();

    if body.is_empty() {
        return Ok(with_index("", StatusCode::NOT_FOUND, state.kv_index));
    }
    Ok(with_index(warp::reply::json(&body), StatusCode::OK, state.kv_index))
}

async fn kv_put(
    key: String,
    params: HashMap<String, String>,
    body: Bytes,
    shared: Shared,
) -> Result<Response, Infallible> {
    let cas: Option<u64> = match params.get("cas").map(|v| v.parse()) {
        Some(Ok(cas)) => Some(cas),
        Some(Err(_)) => return Ok(with_index("Invalid cas index", StatusCode::BAD_REQUEST, 0)),
        None => None,
    };

    let applied = shared.mutate(|state| {
        let current = state.kv.get(&key).map(|r| r.modify_index);
        let allowed = match (cas, current) {
            (None, _) => true,
            (Some(0), None) => true,
            (Some(0), Some(_)) => false,
            (Some(expected), Some(actual)) => expected == actual,
            (Some(_), None) => false,
        };
        if allowed {
            put_kv(state, &key, body.to_vec());
        }
        allowed
    });
    Ok(with_index(applied.to_string(), StatusCode::OK, 0))
}
