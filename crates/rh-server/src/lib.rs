//! Run configuration and lifecycle coordination for Request Hole.
//!
//! [`RunConfig`] describes one run. [`RequestHole`] turns it into a capture
//! source plus a set of sinks, and the [`Coordinator`] wires them together
//! through the event fabric and waits for the run to end.

pub mod banner;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod server;

pub use config::{LogConfig, Protocol, RunConfig, WebConfig};
pub use coordinator::{Coordinator, RunReport};
pub use error::{ServerError, ServerResult};
pub use server::RequestHole;
