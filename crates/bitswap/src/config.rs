use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for a [`crate::Coordinator`], in the style of
/// `calimero-network`'s `CatchupConfig`: a plain, `serde`-able struct with
/// documented defaults and a `Default` impl, so a host can load it straight
/// from its own configuration file.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[non_exhaustive]
pub struct CoordinatorConfig {
    /// Maximum encoded size of any block, in bytes. A power of two.
    pub max_block_size: usize,

    /// Maximum tree depth a download will accept before rejecting the
    /// root as malformed.
    pub max_block_tree_depth: usize,

    /// How long an active root's download may run before it is silently
    /// reclaimed.
    pub root_download_timeout: Duration,

    /// Bound on each of the command, block-delivery, and deadline queues.
    pub queue_capacity: usize,

    /// Bound on the outbound upcall queue.
    pub upcall_capacity: usize,
}

impl CoordinatorConfig {
    #[must_use]
    pub const fn new(
        max_block_size: usize,
        max_block_tree_depth: usize,
        root_download_timeout: Duration,
        queue_capacity: usize,
        upcall_capacity: usize,
    ) -> Self {
        Self {
            max_block_size,
            max_block_tree_depth,
            root_download_timeout,
            queue_capacity,
            upcall_capacity,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_block_size: 262_144,
            max_block_tree_depth: 2,
            root_download_timeout: Duration::from_secs(600),
            queue_capacity: 100,
            upcall_capacity: 100,
        }
    }
}
