//! Key and prefix watches against the fake agent, with failure injection to
//! exercise the backoff path.

use std::time::Duration;

use catalog_watch::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::common::FakeAgent;
use crate::enable_logger;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_key_watch_follows_value_changes() {
    enable_logger();
    let agent = FakeAgent::start().await;
    agent.set_kv("unrelated", "x");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let mut watcher = agent.client().kv().watch_key("app/color");
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            watcher
                .run(cancel, move |value| {
                    tx.send(value.map(|pair| pair.value_str().into_owned()))
                        .map_err(|e| Error::Callback(e.to_string()))
                })
                .await
        }
    });

    assert_eq!(timeout(EVENT_TIMEOUT, rx.recv()).await.unwrap(), Some(None));

    agent.set_kv("app/color", "blue");
    assert_eq!(
        timeout(EVENT_TIMEOUT, rx.recv()).await.unwrap(),
        Some(Some("blue".to_string()))
    );

    agent.set_kv("app/color", "red");
    assert_eq!(
        timeout(EVENT_TIMEOUT, rx.recv()).await.unwrap(),
        Some(Some("red".to_string()))
    );

    agent.delete_kv("app/color");
    assert_eq!(timeout(EVENT_TIMEOUT, rx.recv()).await.unwrap(), Some(None));

    cancel.cancel();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_prefix_watch_recovers_after_failed_reads() {
    enable_logger();
    let agent = FakeAgent::start().await;
    agent.set_kv("app/a", "1");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let mut watcher = agent.client().kv().watch_prefix("app/");
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let result = watcher
                .run(cancel, move |event| {
                    tx.send(format!("{} {}", event.kind(), event.id()))
                        .map_err(|e| Error::Callback(e.to_string()))
                })
                .await;
            (result, watcher.last_index())
        }
    });

    assert_eq!(timeout(EVENT_TIMEOUT, rx.recv()).await.unwrap().unwrap(), "add app/a");

    agent.fail_reads(3);
    let index = agent.set_kv("app/b", "2");
    assert_eq!(timeout(EVENT_TIMEOUT, rx.recv()).await.unwrap().unwrap(), "add app/b");

    cancel.cancel();
    let (result, last_index) = handle.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(last_index.get(), index);
}
