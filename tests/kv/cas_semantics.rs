//! Compare-and-swap against the fake agent:
//!
//! 1. An unconditional put creates the key.
//! 2. A CAS carrying a stale modify index is refused and leaves the value
//!    untouched.
//! 3. A CAS carrying the current modify index applies.
//! 4. CAS with index 0 only creates absent keys.

use catalog_watch::QueryOptions;

use crate::common::FakeAgent;
use crate::enable_logger;

#[tokio::test]
async fn test_cas_refuses_stale_index() {
    enable_logger();
    let agent = FakeAgent::start().await;
    let kv = agent.client().kv().clone();

    assert!(kv.put("app/color", "blue").await.unwrap());
    let (pair, _) = kv.get("app/color", &QueryOptions::default()).await.unwrap();
    let pair = pair.expect("key exists");
    assert_eq!(pair.value_str(), "blue");

    // someone else writes in between
    agent.set_kv("app/color", "green");

    assert!(!kv.cas("app/color", "red", pair.modify_index).await.unwrap());
    assert_eq!(agent.kv_value("app/color").unwrap().value, b"green".to_vec());

    let (fresh, _) = kv.get("app/color", &QueryOptions::default()).await.unwrap();
    let fresh = fresh.expect("key exists");
    assert!(kv.cas("app/color", "red", fresh.modify_index).await.unwrap());
    assert_eq!(agent.kv_value("app/color").unwrap().value, b"red".to_vec());
}

#[tokio::test]
async fn test_cas_zero_creates_only_absent_keys() {
    enable_logger();
    let agent = FakeAgent::start().await;
    let kv = agent.client().kv().clone();

    assert!(kv.cas("/locks/leader", "node-1", 0).await.unwrap());
    assert!(!kv.cas("/locks/leader", "node-2", 0).await.unwrap());

    assert_eq!(agent.kv_value("locks/leader").unwrap().value, b"node-1".to_vec());
}

#[tokio::test]
async fn test_list_and_missing_key() {
    enable_logger();
    let agent = FakeAgent::start().await;
    let kv = agent.client().kv().clone();
    agent.set_kv("app/a", "1");
    agent.set_kv("app/b", "2");
    agent.set_kv("other/c", "3");

    let (pairs, meta) = kv.list("app/", &QueryOptions::default()).await.unwrap();
    let keys: Vec<_> = pairs.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["app/a", "app/b"]);
    assert_eq!(meta.last_index.get(), 3);

    let (missing, meta) = kv.get("app/none", &QueryOptions::default()).await.unwrap();
    assert!(missing.is_none());
    assert_eq!(meta.last_index.get(), 3);
}
