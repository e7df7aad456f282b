use std::future::Future;

use futures::future::join_all;
use tracing::{debug, error, info};

use rh_capture::{start, CaptureSource};
use rh_fabric::{allocate, DeliveryStats, QuitReason, Sink};

use crate::error::{ServerError, ServerResult};

/// What a finished run delivered, and why it ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Per-sink counters, in sink order.
    pub deliveries: Vec<DeliveryStats>,
    /// `None` when every sink exited without a quit broadcast.
    pub reason: Option<QuitReason>,
}

impl RunReport {
    /// The failure that shut the run down, if it was one.
    pub fn fault(&self) -> Option<&QuitReason> {
        self.reason.as_ref().filter(|reason| reason.is_fatal())
    }

    pub fn dropped(&self) -> u64 {
        self.deliveries.iter().map(|stats| stats.dropped).sum()
    }
}

/// Wires one capture source to a set of sinks and waits for the run to end.
#[derive(Clone, Debug)]
pub struct Coordinator {
    capacity: usize,
}

impl Coordinator {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Run until every sink has finished.
    ///
    /// Each sink runs on its own task with its own channel triple. The
    /// capture task owns the shutdown trigger. When `shutdown` resolves,
    /// quit is broadcast as if the capture had stopped it. Zero sinks are
    /// rejected before any channel exists.
    pub async fn run<F>(
        &self,
        sinks: Vec<Box<dyn Sink>>,
        capture: Box<dyn CaptureSource>,
        shutdown: F,
    ) -> ServerResult<RunReport>
    where
        F: Future<Output = ()> + Send,
    {
        if sinks.is_empty() {
            return Err(ServerError::Config("at least one sink must be configured".into()));
        }

        let names: Vec<&'static str> = sinks.iter().map(|sink| sink.name()).collect();
        let (ends, fan_out, control) = allocate(&names, self.capacity)?;
        let quit = control.quit_switch();
        info!(sinks = ?names, capacity = self.capacity, "starting run");

        let workers: Vec<_> = sinks
            .into_iter()
            .zip(ends)
            .map(|(sink, ends)| tokio::spawn(sink.run(ends)))
            .collect();

        let capture_task = tokio::spawn({
            let fan_out = fan_out.clone();
            async move { start(capture.as_ref(), fan_out, control).await }
        });

        let sinks_done = join_all(workers);
        tokio::pin!(sinks_done);
        let results = tokio::select! {
            results = &mut sinks_done => results,
            _ = shutdown => {
                quit.trip(QuitReason::Interrupted);
                sinks_done.await
            }
        };
        for (name, result) in names.iter().zip(results) {
            if let Err(err) = result {
                error!(sink = *name, %err, "sink task failed");
            }
        }

        // With every sink gone the error funnel drains and the capture stops.
        match capture_task.await {
            Ok(Ok(())) => debug!("capture stopped"),
            Ok(Err(err)) => debug!(%err, "capture ended with error"),
            Err(err) => error!(%err, "capture task failed"),
        }

        let report = RunReport {
            deliveries: fan_out.stats(),
            reason: quit.reason(),
        };
        info!(reason = ?report.reason, dropped = report.dropped(), "run finished");
        Ok(report)
    }
}
