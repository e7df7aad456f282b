use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, Serializer};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;
use uuid::Uuid;

use rh_types::SharedEvent;

/// Depth of each subscriber channel. Ingestion waits on a full channel,
/// so one slot is enough for a consumer that keeps reading.
pub const SUBSCRIBER_BUFFER: usize = 1;

#[derive(Default)]
struct Inner {
    history: Vec<SharedEvent>,
    subscribers: HashMap<String, mpsc::Sender<SharedEvent>>,
}

/// Ordered request history plus the live subscriber registry.
///
/// Both live behind one mutex: an append and its fan-out to subscribers are
/// a single critical section, so every subscriber sees events in history
/// order and none is lost while it stays registered.
#[derive(Clone, Default)]
pub struct RequestStore {
    inner: Arc<Mutex<Inner>>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to history, then hand the event to every registered subscriber.
    ///
    /// Subscribers whose receiving side is gone are removed here.
    pub async fn incoming_request(&self, event: SharedEvent) {
        let mut inner = self.inner.lock().await;
        inner.history.push(Arc::clone(&event));

        let mut gone = Vec::new();
        for (id, tx) in inner.subscribers.iter() {
            if tx.send(Arc::clone(&event)).await.is_err() {
                gone.push(id.clone());
            }
        }
        for id in gone {
            inner.subscribers.remove(&id);
            debug!(subscriber = %id, "pruned closed subscriber");
        }
    }

    /// Snapshot of the history, oldest first.
    pub async fn requests(&self) -> History {
        History(self.inner.lock().await.history.clone())
    }

    /// Empty the history. Returns how many events were removed.
    pub async fn clear_requests(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let cleared = inner.history.len();
        inner.history.clear();
        debug!(cleared, "request history cleared");
        cleared
    }

    /// Register a new subscriber under a fresh id.
    ///
    /// The subscriber sees every event appended after this returns.
    pub async fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.inner.lock().await.subscribers.insert(id.clone(), tx);
        debug!(subscriber = %id, "subscriber registered");
        Subscription {
            id,
            events: rx,
            store: self.clone(),
        }
    }

    async fn unsubscribe(&self, id: &str) -> bool {
        let removed = self.inner.lock().await.subscribers.remove(id).is_some();
        if removed {
            debug!(subscriber = %id, "subscriber removed");
        }
        removed
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.lock().await.subscribers.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.history.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// One live subscriber.
pub struct Subscription {
    id: String,
    events: mpsc::Receiver<SharedEvent>,
    store: RequestStore,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn next(&mut self) -> Option<SharedEvent> {
        self.events.recv().await
    }

    /// Deregister.
    ///
    /// The receiver is dropped before taking the store lock, so an ingestion
    /// blocked on this subscriber's full channel fails its send and releases
    /// the lock instead of waiting forever.
    pub async fn close(self) {
        let Subscription { id, events, store } = self;
        drop(events);
        store.unsubscribe(&id).await;
    }
}

/// Snapshot of the request history. Serializes as a JSON array of events.
#[derive(Clone, Debug, Default)]
pub struct History(Vec<SharedEvent>);

impl History {
    pub fn events(&self) -> &[SharedEvent] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for History {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|event| event.as_ref()))
    }
}
