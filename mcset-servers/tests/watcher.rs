use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mcset_servers::{ChannelWatcher, ServerSet, ServerSetError, WatchExit, Watcher};
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_new_with_watcher() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let watcher = ChannelWatcher::new(["localhost:2181"]);
    let servers = ServerSet::with_watcher(watcher.clone());
    assert_eq!(servers.endpoints().len(), 1, "Initial endpoints should be loaded");
    assert_eq!(servers.event_count(), 1);

    // Discard the signal raised by the initial load.
    let events = servers.events();
    while events.try_recv().is_ok() {}

    watcher.update(["localhost:2181", "localhost:2182"]);
    tokio::time::timeout(TIMEOUT, events.recv_async()).await??;

    assert_eq!(servers.endpoints().len(), 2);
    assert_eq!(servers.event_count(), 2);
    assert_eq!(servers.statistics().num_watcher_events(), 1);

    watcher.close();
    Ok(())
}

#[tokio::test]
async fn test_close_watch() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let calls = Arc::new(AtomicUsize::new(0));
    let (exit_tx, exit_rx) = flume::unbounded();

    let watcher = ChannelWatcher::new(["localhost:2181"]);
    let servers = {
        let calls = calls.clone();
        ServerSet::builder()
            .with_watcher(watcher.clone())
            .on_watch_exit(move |reason| {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = exit_tx.send(reason);
            })
            .build()
    };

    watcher.close();

    let reason = tokio::time::timeout(TIMEOUT, exit_rx.recv_async()).await??;
    assert_eq!(reason, WatchExit::WatcherClosed);

    // Further changes are not applied once the loop has stopped.
    let event_count = servers.event_count();
    watcher.update(["localhost:2181", "localhost:2182"]);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1, "Exit hook should run exactly once");
    assert_eq!(servers.event_count(), event_count);
    assert_eq!(servers.endpoints(), vec!["localhost:2181".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_cancel_watch() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let cancel = CancellationToken::new();
    let (exit_tx, exit_rx) = flume::unbounded();

    let watcher = ChannelWatcher::new(["localhost:2181"]);
    let servers = ServerSet::builder()
        .with_watcher(watcher.clone())
        .with_cancellation(cancel.clone())
        .on_watch_exit(move |reason| {
            let _ = exit_tx.send(reason);
        })
        .build();

    cancel.cancel();

    let reason = tokio::time::timeout(TIMEOUT, exit_rx.recv_async()).await??;
    assert_eq!(reason, WatchExit::Cancelled);
    assert!(!watcher.is_closed(), "Cancelling should not close the watcher");

    watcher.update(["localhost:2181", "localhost:2182"]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(servers.endpoints().len(), 1);
    assert_eq!(servers.statistics().num_watcher_events(), 0);

    // Manual updates keep working once the loop has stopped.
    servers.set_endpoints(watcher.endpoints());
    assert_eq!(servers.endpoints().len(), 2);

    Ok(())
}

#[test]
fn test_new_without_watcher() {
    // Must not require a runtime, block or panic.
    let servers = ServerSet::new();
    assert!(servers.endpoints().is_empty());

    servers.set_endpoints(["localhost:2181"]);
    assert_eq!(servers.endpoints().len(), 1);
    assert_eq!(servers.event_count(), 1);

    let servers = ServerSet::builder().with_replicas(16).build();
    assert!(servers.endpoints().is_empty());
    assert_eq!(servers.event_count(), 0);
}

#[tokio::test]
async fn test_watcher_reports_no_endpoints() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let watcher = ChannelWatcher::new(["localhost:2181", "localhost:2182"]);
    let servers = ServerSet::with_watcher(watcher.clone());
    assert!(servers.pick_server("foo").is_ok());

    watcher.update(Vec::<String>::new());
    wait_for(|| servers.endpoints().is_empty()).await?;
    assert!(matches!(
        servers.pick_server("foo"),
        Err(ServerSetError::NoServers)
    ));

    watcher.update(["localhost:2183"]);
    wait_for(|| servers.endpoints().len() == 1).await?;
    assert_eq!(servers.pick_server("foo")?.port(), 2183);

    watcher.close();
    Ok(())
}

#[tokio::test]
async fn test_each_over_watched_endpoints() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let endpoints = test_helper::unused_endpoints(3);
    let watcher = ChannelWatcher::new(&endpoints);
    let servers = ServerSet::with_watcher(watcher.clone());

    let mut visited = Vec::new();
    servers.each(|addr| {
        visited.push(addr);
        Ok::<_, ServerSetError>(())
    })?;
    visited.sort();

    let mut expected = endpoints
        .iter()
        .map(|endpoint| endpoint.parse::<SocketAddr>())
        .collect::<Result<Vec<_>, _>>()?;
    expected.sort();
    assert_eq!(visited, expected);

    // Failover pass, every server refuses and the sentinel is surfaced.
    let mut attempts = 0;
    let result = servers.each(|_| {
        attempts += 1;
        if attempts == 3 {
            return Err(ServerSetError::NoServers);
        }
        Ok(())
    });
    assert!(matches!(result, Err(ServerSetError::NoServers)));
    assert_eq!(attempts, 3);

    watcher.close();
    Ok(())
}

#[tokio::test]
async fn test_watcher_signal_without_change() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let watcher = ChannelWatcher::new(["localhost:2181"]);
    let servers = ServerSet::with_watcher(watcher.clone());

    watcher.notify();
    wait_for(|| servers.statistics().num_watcher_events() == 1).await?;
    wait_for(|| servers.event_count() == 2).await?;
    assert_eq!(servers.endpoints(), vec!["localhost:2181".to_string()]);

    watcher.close();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_during_updates() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let small = vec!["127.0.0.1:2181", "127.0.0.1:2182"];
    let large = vec![
        "127.0.0.1:2181",
        "127.0.0.1:2182",
        "127.0.0.1:2183",
        "127.0.0.1:2184",
    ];

    let watcher = ChannelWatcher::new(&small);
    let servers = ServerSet::with_watcher(watcher.clone());

    let mut readers = Vec::new();
    for reader in 0..4 {
        let servers = servers.clone();
        readers.push(tokio::spawn(async move {
            for i in 0..2_000 {
                let endpoints = servers.endpoints();
                assert!(
                    endpoints.len() == 2 || endpoints.len() == 4,
                    "Observed a partially updated ring: {endpoints:?}"
                );

                let addr = servers
                    .pick_server(format!("reader-{reader}-key-{i}"))
                    .expect("Servers should always be available");
                assert!((2181..=2184).contains(&addr.port()));

                if i % 100 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }

    for round in 0..50 {
        if round % 2 == 0 {
            watcher.update(&large);
        } else {
            watcher.update(&small);
        }
        tokio::task::yield_now().await;
    }

    for reader in readers {
        reader.await?;
    }

    // The final state always converges on the last reported endpoints.
    wait_for(|| servers.endpoints().len() == small.len()).await?;

    watcher.close();
    Ok(())
}

async fn wait_for(predicate: impl Fn() -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(TIMEOUT, async {
        while !predicate() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}
