use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use rh_types::SharedEvent;

use crate::error::{FabricError, Result};
use crate::fan_out::FanOut;
use crate::shutdown::{Control, ErrorFunnel, QuitSwitch};
use crate::sink::{Quit, SinkFault};

/// Default depth of every sink's event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// The sink-side ends of one channel triple.
///
/// The sink owns the event receiver and is the only party that closes it.
/// The quit receiver and the error sender are single-use.
pub struct SinkEnds {
    name: String,
    events: mpsc::Receiver<SharedEvent>,
    quit: oneshot::Receiver<Quit>,
    quit_seen: bool,
    error: Option<oneshot::Sender<SinkFault>>,
}

impl SinkEnds {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next event, or `None` once quit has been received and
    /// the channel is drained.
    ///
    /// Quit closes the event channel: events already accepted are still
    /// yielded, later publishes count as drops. A dropped quit sender counts
    /// as quit. Once this returns `None` it keeps returning `None`.
    pub async fn next(&mut self) -> Option<SharedEvent> {
        if !self.quit_seen {
            tokio::select! {
                biased;
                _ = &mut self.quit => {
                    self.quit_seen = true;
                    self.events.close();
                    debug!(sink = %self.name, "quit received, draining");
                }
                Some(event) = self.events.recv() => return Some(event),
            }
        }
        self.events.try_recv().ok()
    }

    /// Raise a fatal fault on the error channel.
    ///
    /// Returns `false` if a fault was already raised or nobody listens.
    pub fn fail(&mut self, fault: SinkFault) -> bool {
        match self.error.take() {
            Some(tx) => tx.send(fault).is_ok(),
            None => false,
        }
    }

    /// Close the event channel. Called by the sink on exit.
    pub fn close(&mut self) {
        self.events.close();
        debug!(sink = %self.name, "event channel closed");
    }
}

/// Allocate one channel triple per sink name.
///
/// Returns the sink ends in the order of `names`, the fan-out over every
/// event channel, and the control plane over every quit and error channel.
/// Nothing is allocated when `names` is empty.
pub fn allocate<S: AsRef<str>>(
    names: &[S],
    capacity: usize,
) -> Result<(Vec<SinkEnds>, FanOut, Control)> {
    if names.is_empty() {
        return Err(FabricError::NoSinks);
    }
    if capacity == 0 {
        return Err(FabricError::ZeroCapacity);
    }

    let mut ends = Vec::with_capacity(names.len());
    let mut outlets = Vec::with_capacity(names.len());
    let mut quits = Vec::with_capacity(names.len());
    let mut errors = Vec::with_capacity(names.len());

    for name in names {
        let name = name.as_ref().to_string();
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (quit_tx, quit_rx) = oneshot::channel();
        let (error_tx, error_rx) = oneshot::channel();

        ends.push(SinkEnds {
            name: name.clone(),
            events: event_rx,
            quit: quit_rx,
            quit_seen: false,
            error: Some(error_tx),
        });
        outlets.push((name.clone(), event_tx));
        quits.push((name, quit_tx));
        errors.push(error_rx);
    }

    debug!(sinks = ends.len(), capacity, "channel triples allocated");

    let control = Control::new(QuitSwitch::new(quits), ErrorFunnel::new(errors));
    Ok((ends, FanOut::new(outlets), control))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::QuitReason;
    use rh_types::{EventKind, RequestEvent};

    fn event(msg: &str) -> RequestEvent {
        RequestEvent::ws_activity(EventKind::WsMessage, "/", msg)
    }

    #[test]
    fn zero_sinks_rejected() {
        let names: [&str; 0] = [];
        assert!(matches!(allocate(&names, 8), Err(FabricError::NoSinks)));
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(allocate(&["printer"], 0), Err(FabricError::ZeroCapacity)));
    }

    #[tokio::test]
    async fn ends_deliver_in_capture_order() {
        let (mut ends, fan_out, _control) = allocate(&["printer"], 8).unwrap();
        for msg in ["one", "two", "three"] {
            fan_out.publish(event(msg));
        }
        let sink = &mut ends[0];
        assert_eq!(sink.next().await.unwrap().message(), "one");
        assert_eq!(sink.next().await.unwrap().message(), "two");
        assert_eq!(sink.next().await.unwrap().message(), "three");
    }

    #[tokio::test]
    async fn next_returns_none_after_quit() {
        let (mut ends, _fan_out, control) = allocate(&["printer"], 8).unwrap();
        assert!(control.quit_switch().trip(QuitReason::CaptureStopped));
        assert!(ends[0].next().await.is_none());
        assert!(ends[0].next().await.is_none());
    }

    #[tokio::test]
    async fn queued_events_survive_quit() {
        let (mut ends, fan_out, control) = allocate(&["printer"], 8).unwrap();
        for msg in ["one", "two", "three"] {
            fan_out.publish(event(msg));
        }
        assert!(control.quit_switch().trip(QuitReason::Interrupted));

        let sink = &mut ends[0];
        let mut seen = Vec::new();
        while let Some(event) = sink.next().await {
            seen.push(event.message().to_string());
        }
        assert_eq!(seen, ["one", "two", "three"]);

        // The channel is closed now, so the accounting stays honest.
        assert_eq!(fan_out.publish(event("late")), 0);
        assert_eq!(fan_out.stats()[0].delivered, 3);
        assert_eq!(fan_out.stats()[0].dropped, 1);
        assert!(sink.next().await.is_none());
    }

    #[tokio::test]
    async fn fail_is_single_use() {
        let (mut ends, _fan_out, _control) = allocate(&["logger"], 8).unwrap();
        assert!(ends[0].fail(SinkFault::new("logger", "disk full")));
        assert!(!ends[0].fail(SinkFault::new("logger", "again")));
    }

    #[tokio::test]
    async fn closed_channel_counts_as_drop() {
        let (mut ends, fan_out, _control) = allocate(&["a", "b"], 8).unwrap();
        ends[0].close();
        assert_eq!(fan_out.publish(event("x")), 1);
        let stats = fan_out.stats();
        assert_eq!(stats[0].dropped, 1);
        assert_eq!(stats[1].delivered, 1);
    }
}
