use std::path::PathBuf;

use crate::book::BookFormat;

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the orchestrator
/// can decide between "log only" and a user-facing failure message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),

    /// Choice payload could not be decoded into a format. Logged, never shown to the user.
    #[error("malformed choice: {0:?}")]
    MalformedChoice(String),

    /// Choice does not reply to a document message. Logged, never shown to the user.
    #[error("uncorrelated choice: {0}")]
    UncorrelatedChoice(String),

    #[error("no converter registered for {0}")]
    UnsupportedFormat(BookFormat),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("can't delete {path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
