/// Errors produced while wiring the event fabric.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// A run needs at least one sink.
    #[error("no sinks configured")]
    NoSinks,

    /// Event channels must be able to hold at least one event.
    #[error("channel capacity must be at least 1")]
    ZeroCapacity,
}

/// Convenience alias used throughout the fabric crate.
pub type Result<T> = std::result::Result<T, FabricError>;
