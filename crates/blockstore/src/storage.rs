use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use calimero_primitives::Link;
use eyre::Result;

/// Per-root lifecycle status, persisted alongside a root's blocks.
///
/// `Full` is the only status under which every descendant of the root is
/// guaranteed present; `Partial` covers both "still downloading" and "a
/// crashed `Add` never finished publishing" — recovering from the latter
/// is the host's responsibility, not this adapter's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RootStatus {
    Partial,
    Full,
    Deleting,
}

/// Opaque, keyed byte store with per-root status metadata. Implementors
/// back this with whatever's appropriate (rocksdb, sled, a remote service);
/// the coordinator only ever sees this trait.
///
/// `NotFound` is represented as `Ok(None)` rather than a dedicated error
/// variant, so every call site that tolerates a missing entry (deletion
/// sweeps, root lookups) can do so with a plain `if let Some(..)` instead
/// of matching on error kinds.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Reads a single block's bytes, or `None` if absent.
    async fn view_block(&self, id: Link) -> Result<Option<Vec<u8>>>;

    /// Writes a single block's bytes, overwriting any existing entry.
    async fn put_block(&self, id: Link, bytes: Vec<u8>) -> Result<()>;

    /// Deletes every id in `ids` that is present; ids already absent are
    /// silently skipped, not an error.
    async fn delete_blocks(&self, ids: &[Link]) -> Result<()>;

    /// Current status of `root`, or `None` if it has none on record.
    async fn get_status(&self, root: Link) -> Result<Option<RootStatus>>;

    /// Records `root`'s status, replacing any prior value.
    async fn set_status(&self, root: Link, status: RootStatus) -> Result<()>;

    /// Clears `root`'s status entirely.
    async fn delete_status(&self, root: Link) -> Result<()>;
}

/// `Mutex<HashMap<..>>`-backed `Storage`, enough to drive the coordinator
/// and its end-to-end tests without a real on-disk backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blocks: Mutex<HashMap<Link, Vec<u8>>>,
    statuses: Mutex<HashMap<Link, RootStatus>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn view_block(&self, id: Link) -> Result<Option<Vec<u8>>> {
        let blocks = self.blocks.lock().expect("blockstore mutex poisoned");
        Ok(blocks.get(&id).cloned())
    }

    async fn put_block(&self, id: Link, bytes: Vec<u8>) -> Result<()> {
        let mut blocks = self.blocks.lock().expect("blockstore mutex poisoned");
        let _ignored = blocks.insert(id, bytes);
        Ok(())
    }

    async fn delete_blocks(&self, ids: &[Link]) -> Result<()> {
        let mut blocks = self.blocks.lock().expect("blockstore mutex poisoned");
        for id in ids {
            let _ignored = blocks.remove(id);
        }
        Ok(())
    }

    async fn get_status(&self, root: Link) -> Result<Option<RootStatus>> {
        let statuses = self.statuses.lock().expect("status mutex poisoned");
        Ok(statuses.get(&root).copied())
    }

    async fn set_status(&self, root: Link, status: RootStatus) -> Result<()> {
        let mut statuses = self.statuses.lock().expect("status mutex poisoned");
        let _ignored = statuses.insert(root, status);
        Ok(())
    }

    async fn delete_status(&self, root: Link) -> Result<()> {
        let mut statuses = self.statuses.lock().expect("status mutex poisoned");
        let _ignored = statuses.remove(&root);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/storage.rs"]
mod tests;
