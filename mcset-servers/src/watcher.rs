use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// An external source of truth for the set of cache endpoints.
///
/// The server set consumes a watcher by:
/// - Reading a snapshot of the current endpoints.
/// - Waiting on the change signal, which fires after each change to the snapshot.
///   The signal carries no payload, the snapshot should be re-read.
/// - Treating a disconnected signal channel as the watcher being closed.
pub trait Watcher: Send + Sync + 'static {
    /// A snapshot of the current endpoint identifiers, i.e. `host:port` strings.
    fn endpoints(&self) -> Vec<String>;

    /// The change signal.
    ///
    /// Once the watcher is closed all senders must be dropped so that receivers
    /// observe the channel as disconnected.
    fn events(&self) -> flume::Receiver<()>;

    /// Closes the watcher and with it the change signal.
    fn close(&self);
}

impl<W: Watcher + ?Sized> Watcher for Arc<W> {
    fn endpoints(&self) -> Vec<String> {
        (**self).endpoints()
    }

    fn events(&self) -> flume::Receiver<()> {
        (**self).events()
    }

    fn close(&self) {
        (**self).close()
    }
}

impl<W: Watcher + ?Sized> Watcher for Box<W> {
    fn endpoints(&self) -> Vec<String> {
        (**self).endpoints()
    }

    fn events(&self) -> flume::Receiver<()> {
        (**self).events()
    }

    fn close(&self) {
        (**self).close()
    }
}

#[derive(Clone)]
/// An in-process [Watcher] whose endpoints are pushed by the owner.
///
/// Useful for statically configured clusters, bridging discovery systems which
/// deliver their updates by callback, and for testing.
///
/// Change signals are coalescing, a signal raised while a previous one is still
/// pending is dropped.
pub struct ChannelWatcher {
    inner: Arc<ChannelWatcherInner>,
}

struct ChannelWatcherInner {
    endpoints: RwLock<Vec<String>>,
    tx: Mutex<Option<flume::Sender<()>>>,
    rx: flume::Receiver<()>,
}

impl ChannelWatcher {
    /// Creates a new watcher with an initial set of endpoints.
    pub fn new(endpoints: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let (tx, rx) = flume::bounded(1);

        Self {
            inner: Arc::new(ChannelWatcherInner {
                endpoints: RwLock::new(to_owned_endpoints(endpoints)),
                tx: Mutex::new(Some(tx)),
                rx,
            }),
        }
    }

    /// Replaces the endpoints and signals the change.
    ///
    /// Once the watcher is closed the endpoints are still replaced but
    /// no signal is raised.
    pub fn update(&self, endpoints: impl IntoIterator<Item = impl AsRef<str>>) {
        *self.inner.endpoints.write() = to_owned_endpoints(endpoints);
        self.notify();
    }

    /// Raises a change signal without altering the endpoints.
    pub fn notify(&self) {
        if let Some(tx) = self.inner.tx.lock().as_ref() {
            let _ = tx.try_send(());
        }
    }

    /// Returns if the watcher has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.tx.lock().is_none()
    }
}

impl Default for ChannelWatcher {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl Watcher for ChannelWatcher {
    fn endpoints(&self) -> Vec<String> {
        self.inner.endpoints.read().clone()
    }

    fn events(&self) -> flume::Receiver<()> {
        self.inner.rx.clone()
    }

    fn close(&self) {
        // Dropping the only sender disconnects every receiver.
        self.inner.tx.lock().take();
    }
}

fn to_owned_endpoints(endpoints: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    endpoints
        .into_iter()
        .map(|endpoint| endpoint.as_ref().to_string())
        .collect()
}
