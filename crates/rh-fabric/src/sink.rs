use async_trait::async_trait;

use crate::channels::SinkEnds;

/// Token carried by a sink's quit channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quit;

/// Fatal failure raised by a sink on its error channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkFault {
    pub sink: String,
    pub reason: String,
}

impl SinkFault {
    pub fn new(sink: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            sink: sink.into(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for SinkFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} sink failed: {}", self.sink, self.reason)
    }
}

/// An independent consumer of captured events.
///
/// A sink runs as its own task, consuming `ends` until quit is received. A
/// sink that cannot start reports through [`SinkEnds::fail`] and returns.
#[async_trait]
pub trait Sink: Send {
    /// Short name used for channel bookkeeping and diagnostics.
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>, ends: SinkEnds);
}
