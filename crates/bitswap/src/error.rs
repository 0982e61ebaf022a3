use calimero_primitives::Link;
use thiserror::Error;

/// The coordinator's closed internal error set. None of these ever escape
/// the event loop: each is logged and, where applicable, turned into an
/// upcall by the call site that produced it. Adapter errors (`Storage`,
/// `Engine`) arrive as `eyre::Report` and are folded into `StorageFault`
/// with their message preserved, rather than threading a foreign error
/// type through this enum.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("root {root}: malformed block ({reason})")]
    MalformedBlock { root: Link, reason: String },

    #[error("{context}: {source}")]
    StorageFault { context: String, source: String },

    #[error("root {root}: download timed out")]
    DownloadTimeout { root: Link },

    #[error("root {root}: upcall queue full, event dropped")]
    QueueFull { root: Link },

    #[error("root {root}: download already in progress")]
    DownloadInProgress { root: Link },
}
