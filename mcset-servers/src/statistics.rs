use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live metrics around the server set.
pub struct ServerSetStatistics(Arc<ServerSetStatisticsInner>);

impl Deref for ServerSetStatistics {
    type Target = ServerSetStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct ServerSetStatisticsInner {
    /// The number of endpoints currently in the ring.
    pub(crate) num_endpoints: Counter,
    /// The number of times the ring has been replaced and observers notified.
    pub(crate) num_updates: Counter,
    /// The number of notifications coalesced because the event slot was already full.
    pub(crate) num_dropped_events: Counter,
    /// The number of change signals handled by the watch loop.
    pub(crate) num_watcher_events: Counter,
}

impl ServerSetStatisticsInner {
    /// The number of endpoints currently in the ring.
    pub fn num_endpoints(&self) -> u64 {
        self.num_endpoints.load(Ordering::Relaxed)
    }

    /// The number of times the ring has been replaced and observers notified.
    pub fn num_updates(&self) -> u64 {
        self.num_updates.load(Ordering::Acquire)
    }

    /// The number of notifications coalesced because the event slot was already full.
    pub fn num_dropped_events(&self) -> u64 {
        self.num_dropped_events.load(Ordering::Relaxed)
    }

    /// The number of change signals handled by the watch loop.
    pub fn num_watcher_events(&self) -> u64 {
        self.num_watcher_events.load(Ordering::Relaxed)
    }
}
