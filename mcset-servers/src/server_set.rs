use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use flume::TrySendError;
use mcset_ring::HashRing;
use parking_lot::RwLock;
use tracing::debug;

use crate::addr::resolve_endpoint;
use crate::statistics::ServerSetStatistics;
use crate::{ServerSetBuilder, ServerSetError, Watcher};

#[derive(Clone)]
/// A set of cache servers with keys distributed over them by consistent hashing.
///
/// The set is a cheap handle, clones share the same ring, event channel and statistics.
///
/// The ring is never mutated in place. Updates build a complete new ring and
/// swap it in, readers work on the snapshot which was current when they started.
pub struct ServerSet {
    ring: Arc<RwLock<Arc<HashRing>>>,
    replicas: usize,
    events_tx: flume::Sender<()>,
    events_rx: flume::Receiver<()>,
    statistics: ServerSetStatistics,
}

impl Default for ServerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerSet {
    /// Creates a new empty server set with no watcher attached.
    ///
    /// Endpoints must be provided manually via [ServerSet::set_endpoints].
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new server set kept in sync with the given watcher.
    ///
    /// See [ServerSetBuilder::build] for the behaviour of the background task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn with_watcher(watcher: impl Watcher) -> Self {
        Self::builder().with_watcher(watcher).build()
    }

    /// Creates a builder for configuring a new server set.
    pub fn builder() -> ServerSetBuilder {
        ServerSetBuilder::new()
    }

    pub(crate) fn empty(replicas: usize) -> Self {
        let (events_tx, events_rx) = flume::bounded(1);

        Self {
            ring: Arc::new(RwLock::new(Arc::new(HashRing::with_replicas(replicas)))),
            replicas,
            events_tx,
            events_rx,
            statistics: ServerSetStatistics::default(),
        }
    }

    /// The endpoints currently in the ring, sorted.
    pub fn endpoints(&self) -> Vec<String> {
        self.snapshot().members()
    }

    /// Replaces every endpoint in the ring and notifies observers.
    ///
    /// Duplicate endpoints are collapsed.
    pub fn set_endpoints(&self, endpoints: impl IntoIterator<Item = impl AsRef<str>>) {
        let mut ring = HashRing::with_replicas(self.replicas);
        ring.set_members(endpoints);

        let num_endpoints = ring.len();

        // The count is stored under the write lock so racing writers leave it
        // matching whichever ring was swapped in last.
        let mut guard = self.ring.write();
        *guard = Arc::new(ring);
        self.statistics
            .num_endpoints
            .store(num_endpoints as u64, Ordering::Relaxed);
        drop(guard);

        self.trigger_event();
    }

    /// Selects the server which owns the given key.
    ///
    /// # Blocking
    ///
    /// Hostname endpoints are resolved through the system resolver, which blocks.
    /// Async callers should use literal socket addresses or call this via
    /// `tokio::task::spawn_blocking`.
    pub fn pick_server(&self, key: impl AsRef<[u8]>) -> Result<SocketAddr, ServerSetError> {
        let ring = self.snapshot();
        let endpoint = ring.get(key)?;
        resolve_endpoint(endpoint)
    }

    /// Selects the endpoint identifier which owns the given key, without resolving it.
    pub fn pick_endpoint(&self, key: impl AsRef<[u8]>) -> Result<String, ServerSetError> {
        let ring = self.snapshot();
        let endpoint = ring.get(key)?;
        Ok(endpoint.to_string())
    }

    /// Selects up to `n` distinct servers for the given key.
    ///
    /// The first server is the key's owner, the remainder follow in ring order and
    /// are the servers the key would move to if the servers before them went away.
    ///
    /// # Blocking
    ///
    /// Resolves every selected endpoint, see [ServerSet::pick_server].
    pub fn pick_servers(
        &self,
        key: impl AsRef<[u8]>,
        n: usize,
    ) -> Result<Vec<SocketAddr>, ServerSetError> {
        let ring = self.snapshot();
        ring.get_n(key, n)?
            .into_iter()
            .map(resolve_endpoint)
            .collect()
    }

    /// Calls `f` with the address of each server in a stable order.
    ///
    /// Iteration stops at the first error which is returned to the caller, this
    /// includes failing to resolve an endpoint. Callers implementing failover
    /// typically return [ServerSetError::NoServers] once every server has
    /// been tried without success.
    ///
    /// # Blocking
    ///
    /// Resolves each endpoint before calling `f`, see [ServerSet::pick_server].
    pub fn each<F, E>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(SocketAddr) -> Result<(), E>,
        E: From<ServerSetError>,
    {
        let ring = self.snapshot();
        for endpoint in ring.iter() {
            let addr = resolve_endpoint(endpoint)?;
            f(addr)?;
        }

        Ok(())
    }

    #[inline]
    /// Get a receiver which is signalled after each update to the endpoints.
    ///
    /// The channel holds a single pending signal, signals raised while one is
    /// already pending are coalesced into it. Every receiver returned shares the
    /// same channel, so a signal is only ever observed by one of them.
    pub fn events(&self) -> flume::Receiver<()> {
        self.events_rx.clone()
    }

    #[inline]
    /// The number of times the endpoints have been updated and observers notified.
    pub fn event_count(&self) -> u64 {
        self.statistics.num_updates()
    }

    #[inline]
    /// Gets the live server set statistics.
    pub fn statistics(&self) -> ServerSetStatistics {
        self.statistics.clone()
    }

    pub(crate) fn record_watcher_event(&self) {
        self.statistics
            .num_watcher_events
            .fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Arc<HashRing> {
        self.ring.read().clone()
    }

    fn trigger_event(&self) {
        // Release pairs with the acquire in `num_updates`, a reader observing
        // the new count also observes the ring swapped in before it.
        let event_count = self.statistics.num_updates.fetch_add(1, Ordering::AcqRel) + 1;

        if let Err(TrySendError::Full(())) = self.events_tx.try_send(()) {
            self.statistics
                .num_dropped_events
                .fetch_add(1, Ordering::Relaxed);
        }

        debug!(
            event_count = event_count,
            num_endpoints = self.statistics.num_endpoints(),
            "Server set endpoints have been updated."
        );
    }
}
