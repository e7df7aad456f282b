use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("query error: {0}")]
    Query(String),
}

pub type WebResult<T> = Result<T, WebError>;
