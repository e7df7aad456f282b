use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("fabric error: {0}")]
    Fabric(#[from] rh_fabric::FabricError),

    #[error("capture error: {0}")]
    Capture(#[from] rh_capture::CaptureError),
}

pub type ServerResult<T> = Result<T, ServerError>;
