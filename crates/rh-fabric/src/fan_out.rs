use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{trace, warn};

use rh_types::{RequestEvent, SharedEvent};

/// Drops are logged on the first one and then once per this many.
const DROP_LOG_EVERY: u64 = 1000;

/// Delivery counters of one sink's event channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sink: String,
    pub delivered: u64,
    pub dropped: u64,
}

struct Outlet {
    name: String,
    sender: mpsc::Sender<SharedEvent>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Outlet {
    fn record_drop(&self, reason: &'static str) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        if dropped == 1 || dropped % DROP_LOG_EVERY == 0 {
            warn!(sink = %self.name, dropped, reason, "event dropped for sink");
        }
    }
}

/// Sending side of every sink's event channel.
///
/// Publishing never waits: a full or closed channel drops the event for that
/// sink only and bumps its drop counter. Cheap to clone; clones share counters.
#[derive(Clone)]
pub struct FanOut {
    outlets: Arc<Vec<Outlet>>,
}

impl FanOut {
    pub(crate) fn new(outlets: Vec<(String, mpsc::Sender<SharedEvent>)>) -> Self {
        let outlets = outlets
            .into_iter()
            .map(|(name, sender)| Outlet {
                name,
                sender,
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            })
            .collect();
        Self {
            outlets: Arc::new(outlets),
        }
    }

    /// Send a copy of `event` to every sink. Returns how many accepted it.
    pub fn publish(&self, event: RequestEvent) -> usize {
        let event = event.into_shared();
        let mut accepted = 0;
        for outlet in self.outlets.iter() {
            match outlet.sender.try_send(Arc::clone(&event)) {
                Ok(()) => {
                    outlet.delivered.fetch_add(1, Ordering::Relaxed);
                    accepted += 1;
                }
                Err(TrySendError::Full(_)) => outlet.record_drop("channel full"),
                Err(TrySendError::Closed(_)) => outlet.record_drop("channel closed"),
            }
        }
        trace!(id = %event.id(), kind = %event.kind(), accepted, "event published");
        accepted
    }

    pub fn sink_count(&self) -> usize {
        self.outlets.len()
    }

    /// Per-sink counters, in allocation order.
    pub fn stats(&self) -> Vec<DeliveryStats> {
        self.outlets
            .iter()
            .map(|outlet| DeliveryStats {
                sink: outlet.name.clone(),
                delivered: outlet.delivered.load(Ordering::Relaxed),
                dropped: outlet.dropped.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Total drops across all sinks.
    pub fn dropped(&self) -> u64 {
        self.outlets
            .iter()
            .map(|outlet| outlet.dropped.load(Ordering::Relaxed))
            .sum()
    }
}
