use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid response code: {0}")]
    InvalidStatus(u16),

    #[error("capture server error: {0}")]
    Serve(#[from] std::io::Error),
}

pub type CaptureResult<T> = Result<T, CaptureError>;
