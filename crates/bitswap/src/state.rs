use std::collections::HashSet;

use calimero_primitives::Link;
use tokio_util::sync::CancellationToken;

/// Which root an in-flight content id is expected by, and at what depth.
/// Depth 1 is the root itself; a child at depth `d` is expected at `d+1`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChildParams {
    pub root: Link,
    pub depth: usize,
}

/// Per-root bookkeeping for an active download. Dropped in full by
/// [`crate::coordinator::Coordinator::retire`], which is the only place
/// that cancels `cancel`.
pub(crate) struct RootDownloadState<S> {
    pub not_visited: HashSet<Link>,
    pub all_descendants: HashSet<Link>,
    pub session: S,
    /// 0 while unknown; positive once inferred from a leaf-level block.
    pub tree_depth: usize,
    pub processed_short_node: bool,
    pub cancel: CancellationToken,
}

impl<S> RootDownloadState<S> {
    pub fn new(root: Link, session: S, cancel: CancellationToken) -> Self {
        Self {
            not_visited: HashSet::from([root]),
            all_descendants: HashSet::from([root]),
            session,
            tree_depth: 0,
            processed_short_node: false,
            cancel,
        }
    }
}
