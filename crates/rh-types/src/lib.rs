//! Foundation types for Request Hole.
//!
//! Every captured unit of inbound work becomes a [`RequestEvent`]. Events are
//! created once by a capture source and shared read-only with every sink.
//!
//! # Key Types
//!
//! - [`RequestEvent`] — Normalized record of one HTTP request or WebSocket frame
//! - [`EventKind`] — What kind of inbound work the event describes
//! - [`Headers`] — Header multimap with sorted, comma-joined rendering
//! - [`Params`] — Ordered request parameters and their `{"k" => "v"}` rendering
//! - [`ServerInfo`] — Echo of the run configuration and build metadata

pub mod event;
pub mod headers;
pub mod info;
pub mod params;

pub use event::{EventId, EventKind, RequestEvent, SharedEvent};
pub use headers::Headers;
pub use info::{BuildInfo, ServerInfo};
pub use params::{Param, Params};
