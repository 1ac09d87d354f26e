//! Errors raised while redirecting a standard stream.

use thiserror::Error;

use crate::capture::StdStream;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot redirect {stream}: {source}")]
    Redirect {
        stream: StdStream,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot restore {stream}: {source}")]
    Restore {
        stream: StdStream,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read captured output: {0}")]
    Read(#[from] std::io::Error),
}
