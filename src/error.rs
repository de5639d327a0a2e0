use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("feed request failed: {0}")]
    FeedHttp(String),

    #[error("feed returned status {status}: {message}")]
    FeedStatus { status: u16, message: String },

    #[error("payload request failed: {0}")]
    PayloadHttp(String),

    #[error("payload returned status {status}: {message}")]
    PayloadStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to parse map metadata: {0}")]
    MetaParse(String),

    #[error("map {0} has no versions")]
    MissingVersion(String),

    #[error("malformed archive {path}: {message}")]
    MalformedArchive { path: String, message: String },
}
