//! Event fabric for Request Hole.
//!
//! Every sink gets a private channel triple: a bounded event channel, a
//! single-use quit channel and a single-use error channel. The capture side
//! holds the sending half of every event channel ([`FanOut`]) and the
//! [`Control`] plane: the one-time [`QuitSwitch`] plus the [`ErrorFunnel`]
//! that merges every sink's error channel into one wait point.

pub mod channels;
pub mod diagnostic;
pub mod error;
pub mod fan_out;
pub mod shutdown;
pub mod sink;

pub use channels::{allocate, SinkEnds, DEFAULT_CHANNEL_CAPACITY};
pub use diagnostic::print_fatal;
pub use error::{FabricError, Result};
pub use fan_out::{DeliveryStats, FanOut};
pub use shutdown::{Control, ErrorFunnel, QuitReason, QuitSwitch};
pub use sink::{Quit, Sink, SinkFault};
