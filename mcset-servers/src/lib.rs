//! # mcset Servers
//! A dynamic set of cache servers for key-value cache clients.
//!
//! A [ServerSet] keeps a consistent hash ring over a set of `host:port` endpoints and
//! answers which server owns a given key. The ring can be updated manually or kept in
//! sync with an external [Watcher], in which case a background task re-reads the
//! watcher's endpoints each time it signals a change.
//!
//! ```rust
//! use mcset_servers::{ServerSet, ServerSetError};
//!
//! let servers = ServerSet::new();
//! servers.set_endpoints(["127.0.0.1:11211", "127.0.0.1:11212"]);
//!
//! let owner = servers.pick_server("user:42").expect("Servers are available");
//! assert_eq!(owner.ip().to_string(), "127.0.0.1");
//!
//! // Broadcast to every server, stopping at the first failure.
//! let mut visited = Vec::new();
//! servers
//!     .each(|addr| {
//!         visited.push(addr);
//!         Ok::<_, ServerSetError>(())
//!     })
//!     .expect("Every server is reachable");
//! assert_eq!(visited.len(), 2);
//! ```

mod addr;
mod error;
mod server_set;
mod statistics;
mod watch;
mod watcher;

use std::sync::Arc;

pub use addr::resolve_endpoint;
pub use error::ServerSetError;
pub use mcset_ring::{HashRing, RingError, DEFAULT_REPLICAS};
pub use server_set::ServerSet;
pub use statistics::{ServerSetStatistics, ServerSetStatisticsInner};
use tokio_util::sync::CancellationToken;
use tracing::info;
pub use watch::{WatchExit, WatchExitHook};
pub use watcher::{ChannelWatcher, Watcher};

/// Build a server set using the provided settings.
pub struct ServerSetBuilder {
    replicas: usize,
    watcher: Option<Box<dyn Watcher>>,
    cancel: Option<CancellationToken>,
    on_exit: Option<WatchExitHook>,
}

impl Default for ServerSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerSetBuilder {
    /// Create a new server set builder.
    pub fn new() -> Self {
        Self {
            replicas: DEFAULT_REPLICAS,
            watcher: None,
            cancel: None,
            on_exit: None,
        }
    }

    /// Set the number of virtual nodes each endpoint is given on the ring.
    ///
    /// Defaults to [DEFAULT_REPLICAS].
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Keep the server set in sync with the given watcher.
    pub fn with_watcher(mut self, watcher: impl Watcher) -> Self {
        self.watcher = Some(Box::new(watcher));
        self
    }

    /// Stop the watch loop when the given token is cancelled.
    ///
    /// Without a token the loop only stops once the watcher is closed.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set a callback to be invoked once the watch loop stops.
    pub fn on_watch_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(WatchExit) + Send + Sync + 'static,
    {
        self.on_exit = Some(Arc::new(hook));
        self
    }

    /// Creates the server set.
    ///
    /// If a watcher has been provided its current endpoints are loaded before
    /// returning and a background task is spawned to apply subsequent changes.
    /// The task holds a handle to the set and runs until the watcher is closed
    /// or the cancellation token, if any, is cancelled.
    ///
    /// # Panics
    ///
    /// Panics if a watcher is provided and this is called outside of a tokio runtime.
    pub fn build(self) -> ServerSet {
        let servers = ServerSet::empty(self.replicas);

        let Some(watcher) = self.watcher else {
            return servers;
        };

        // Subscribe before the initial read so no change is missed in between.
        let changes = watcher.events();
        servers.set_endpoints(watcher.endpoints());

        info!(
            num_endpoints = servers.statistics().num_endpoints(),
            replicas = self.replicas,
            "Starting endpoint watch loop."
        );

        tokio::spawn(watch::watch_endpoint_changes(
            servers.clone(),
            watcher,
            changes,
            self.cancel.unwrap_or_else(CancellationToken::new),
            self.on_exit,
        ));

        servers
    }
}
