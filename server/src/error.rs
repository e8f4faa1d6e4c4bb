use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {0}")]
    Address(String),

    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open activity log {}: {source}", path.display())]
    ActivityLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error accepting client: {0}")]
    Accept(#[source] io::Error),
}
