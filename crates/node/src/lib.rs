//! Wiring glue tying a [`calimero_bitswap`] coordinator to the in-memory
//! `calimero_blockstore`/`calimero_bitswap` reference adapters, for local
//! exercising and the crate's end-to-end tests. A real deployment swaps
//! `MemoryStorage`/`LoopbackEngine` for a persistent store and a live
//! libp2p-backed `Engine`; everything else here is unchanged.

use std::sync::Arc;

use calimero_bitswap::{spawn, CoordinatorConfig, CoordinatorHandle, LoopbackEngine};
use calimero_blockstore::MemoryStorage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use calimero_bitswap::{CoordinatorError, ResourceUpdateKind, ResourceUpdated};
pub use calimero_blockstore::RootStatus;
pub use calimero_primitives::Link;

/// A coordinator running against a fresh, empty `MemoryStorage`/
/// `LoopbackEngine` pair. Clone `engine` to hand a second node a view of
/// the same simulated network, as the end-to-end tests do.
pub struct LocalNode {
    pub handle: CoordinatorHandle,
    pub upcalls: mpsc::Receiver<ResourceUpdated>,
    pub storage: Arc<MemoryStorage>,
    pub engine: Arc<LoopbackEngine>,
    pub cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl LocalNode {
    #[must_use]
    pub fn spawn(config: CoordinatorConfig) -> Self {
        Self::spawn_on(Arc::new(LoopbackEngine::new()), config)
    }

    /// Spawns a node sharing an existing simulated network, so a second
    /// peer can discover blocks the first one published.
    #[must_use]
    pub fn spawn_on(engine: Arc<LoopbackEngine>, config: CoordinatorConfig) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let (handle, upcalls, cancel, join) = spawn(Arc::clone(&engine), Arc::clone(&storage), config);
        Self {
            handle,
            upcalls,
            storage,
            engine,
            cancel,
            join,
        }
    }

    /// Cancels the coordinator and waits for its event loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ignored = self.join.await;
    }
}
