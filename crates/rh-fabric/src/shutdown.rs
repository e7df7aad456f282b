use std::sync::{Arc, Mutex, PoisonError};

use futures::future::select_all;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::sink::{Quit, SinkFault};

/// Why a run was told to quit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuitReason {
    /// The capture listener could not bind.
    BindFailed(String),
    /// A sink raised a fatal fault.
    SinkFault(SinkFault),
    /// The capture source stopped on its own.
    CaptureStopped,
    /// The operator stopped the run.
    Interrupted,
}

impl QuitReason {
    /// Whether the run ended because something broke.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BindFailed(_) | Self::SinkFault(_))
    }
}

impl std::fmt::Display for QuitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BindFailed(reason) => write!(f, "capture listener failed: {reason}"),
            Self::SinkFault(fault) => write!(f, "{fault}"),
            Self::CaptureStopped => write!(f, "capture source stopped"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

#[derive(Default)]
struct SwitchState {
    quits: Vec<(String, oneshot::Sender<Quit>)>,
    reason: Option<QuitReason>,
}

/// One-time broadcast of a quit token to every sink.
///
/// The first [`trip`](Self::trip) sends exactly one token on every quit
/// channel; later trips are no-ops.
#[derive(Clone)]
pub struct QuitSwitch {
    state: Arc<Mutex<SwitchState>>,
}

impl QuitSwitch {
    pub(crate) fn new(quits: Vec<(String, oneshot::Sender<Quit>)>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SwitchState {
                quits,
                reason: None,
            })),
        }
    }

    /// Broadcast quit. Returns `true` only for the call that did it.
    pub fn trip(&self, reason: QuitReason) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.reason.is_some() {
            debug!(%reason, "quit already broadcast");
            return false;
        }
        info!(%reason, sinks = state.quits.len(), "broadcasting quit");
        for (sink, quit) in state.quits.drain(..) {
            // A sink that already exited has dropped its receiver.
            if quit.send(Quit).is_err() {
                debug!(%sink, "sink gone before quit");
            }
        }
        state.reason = Some(reason);
        true
    }

    pub fn is_tripped(&self) -> bool {
        self.reason().is_some()
    }

    /// The reason given to the first trip, if any.
    pub fn reason(&self) -> Option<QuitReason> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reason
            .clone()
    }
}

/// Fan-in over every sink's error channel.
pub struct ErrorFunnel {
    errors: Vec<oneshot::Receiver<SinkFault>>,
}

impl ErrorFunnel {
    pub(crate) fn new(errors: Vec<oneshot::Receiver<SinkFault>>) -> Self {
        Self { errors }
    }

    /// Wait for the first fault raised by any sink.
    ///
    /// A sink that exits without raising one just drops out of the wait.
    /// Returns `None` once every sink is gone without a fault.
    pub async fn first_fault(self) -> Option<SinkFault> {
        let mut pending = self.errors;
        while !pending.is_empty() {
            let (outcome, _index, rest) = select_all(pending).await;
            match outcome {
                Ok(fault) => return Some(fault),
                Err(_) => pending = rest,
            }
        }
        None
    }
}

/// Control plane handed to the capture source: every quit channel and every
/// error channel of the run.
pub struct Control {
    quit: QuitSwitch,
    errors: ErrorFunnel,
}

impl Control {
    pub(crate) fn new(quit: QuitSwitch, errors: ErrorFunnel) -> Self {
        Self { quit, errors }
    }

    pub fn quit_switch(&self) -> QuitSwitch {
        self.quit.clone()
    }

    /// Wait on the merged error channels and broadcast quit on the first fault.
    ///
    /// Returns the reason the run quit with, which may come from another
    /// trip (for example a bind failure) if that happened first.
    pub async fn supervise(self) -> Option<QuitReason> {
        let Control { quit, errors } = self;
        if let Some(fault) = errors.first_fault().await {
            error!(sink = %fault.sink, reason = %fault.reason, "sink raised a fatal error");
            quit.trip(QuitReason::SinkFault(fault));
        }
        quit.reason()
    }
}
