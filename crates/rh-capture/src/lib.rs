//! Capture sources for Request Hole.
//!
//! A capture source binds the endpoint under inspection, turns every unit of
//! inbound work into a [`rh_types::RequestEvent`] and publishes it through the
//! run's [`rh_fabric::FanOut`]. It also owns the run's shutdown trigger: a
//! bind failure or the first sink fault broadcasts quit to every sink.

pub mod error;
pub mod http;
pub mod params;
pub mod source;
pub mod ws;

pub use error::{CaptureError, CaptureResult};
pub use http::HttpCapture;
pub use source::{serve, start, CaptureSource};
pub use ws::WsCapture;
