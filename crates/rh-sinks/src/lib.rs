//! Observational sinks for Request Hole.
//!
//! - [`Printer`] renders each event to the terminal.
//! - [`Logger`] appends each event to a log file.
//!
//! Both consume their own event channel until quit and never push back on
//! the capture source.

pub mod error;
pub mod logger;
pub mod printer;
pub mod table;

pub use error::{SinkError, SinkResult};
pub use logger::Logger;
pub use printer::Printer;
