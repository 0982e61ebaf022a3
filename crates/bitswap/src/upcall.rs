use calimero_primitives::Link;
use tokio::sync::oneshot;

/// A command submitted by the host.
#[derive(Debug)]
pub enum Command {
    /// Split `data` into a block tree and publish it.
    ///
    /// `reply` is not part of the coordinator's observable behavior — it
    /// fires once the command has been fully handled (successfully or
    /// not) purely so callers (tests, in particular) can await completion
    /// without racing the upcall channel.
    Add {
        data: Vec<u8>,
        reply: oneshot::Sender<()>,
    },
    /// Reclaim the given roots and everything under them.
    Delete { root_ids: Vec<Link> },
    /// Begin downloading the given roots, deduplicated against any
    /// already in-flight.
    Download { root_ids: Vec<Link> },
}

/// The kind of resource-update upcall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUpdateKind {
    Added,
    Removed,
    Broken,
}

/// Emitted onto the outbound channel whenever one or more roots change
/// state. Never blocks the event loop: see [`crate::error::CoordinatorError::QueueFull`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUpdated {
    pub kind: ResourceUpdateKind,
    pub roots: Vec<Link>,
}
