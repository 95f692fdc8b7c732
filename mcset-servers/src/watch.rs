use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{ServerSet, Watcher};

/// Why the endpoint watch loop stopped.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WatchExit {
    /// The watcher's change signal was disconnected.
    WatcherClosed,
    /// The cancellation token given to the builder was cancelled.
    Cancelled,
}

/// A callback invoked once when the endpoint watch loop stops.
pub type WatchExitHook = Arc<dyn Fn(WatchExit) + Send + Sync>;

/// Watches for changes reported by the watcher.
///
/// Each signal re-reads the watcher's endpoints and replaces the server set's ring.
/// The loop runs until the watcher's signal is disconnected or `cancel` is cancelled,
/// it is never restarted.
pub(crate) async fn watch_endpoint_changes(
    servers: ServerSet,
    watcher: Box<dyn Watcher>,
    changes: flume::Receiver<()>,
    cancel: CancellationToken,
    on_exit: Option<WatchExitHook>,
) {
    let exit = loop {
        let signal = tokio::select! {
            biased;
            _ = cancel.cancelled() => break WatchExit::Cancelled,
            signal = changes.recv_async() => signal,
        };

        if signal.is_err() {
            break WatchExit::WatcherClosed;
        }

        servers.record_watcher_event();

        let endpoints = watcher.endpoints();
        if endpoints.is_empty() {
            warn!("Watcher reported no endpoints, keys cannot be assigned until servers are added.");
        }

        servers.set_endpoints(endpoints);
    };

    info!(
        reason = ?exit,
        num_endpoints = servers.statistics().num_endpoints(),
        event_count = servers.event_count(),
        "Endpoint watch loop has stopped."
    );

    if let Some(hook) = on_exit {
        hook(exit);
    }
}
