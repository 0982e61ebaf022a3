use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calimero_primitives::Link;
use eyre::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A block as delivered by a session: its content id alongside its raw
/// encoded bytes, exactly as they'd be decoded by `calimero_blockstore`.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub id: Link,
    pub bytes: Vec<u8>,
}

/// A subscription to the block-exchange engine, scoped to a single root's
/// download. Deliveries arrive out-of-band on the receiver handed back by
/// [`Engine::new_session`], not as the return value of `get_blocks`.
#[async_trait]
pub trait Session: Send + 'static {
    /// Asks the network for the given content ids. Returns once the
    /// request has been issued, not once blocks arrive.
    async fn get_blocks(&mut self, ids: Vec<Link>) -> Result<()>;
}

/// The opaque block-swap engine: publishes blocks and opens download
/// sessions. Implementations back this with a real libp2p/bitswap swarm;
/// the coordinator only ever sees this trait.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    type Session: Session;

    /// Stores `bytes` under `id` and announces its availability to the
    /// network. Used by `Add` to publish every block of a freshly split
    /// tree.
    async fn has_block(&self, id: Link, bytes: Vec<u8>) -> Result<()>;

    /// Opens a session bound to `cancel`: dropping or cancelling it tears
    /// the session down. Returns the session handle plus the receiving
    /// end of its block-delivery channel.
    async fn new_session(
        &self,
        cancel: CancellationToken,
    ) -> Result<(Self::Session, mpsc::Receiver<RawBlock>)>;
}

/// In-memory `Engine`/`Session` pair wired to a shared block table, enough
/// to drive the coordinator's end-to-end scenarios without a live swarm.
/// `get_blocks` delivers immediately from the table if present; ids with
/// no entry are simply never delivered, simulating an unresponsive peer
/// (used by the timeout scenario).
#[derive(Debug, Clone, Default)]
pub struct LoopbackEngine {
    table: Arc<Mutex<HashMap<Link, Vec<u8>>>>,
}

impl LoopbackEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the engine's network-side table directly, bypassing
    /// `has_block`. Used by tests to simulate blocks a remote peer
    /// already has, without going through a local `Add`.
    pub fn seed(&self, id: Link, bytes: Vec<u8>) {
        let mut table = self.table.lock().expect("loopback table poisoned");
        let _ignored = table.insert(id, bytes);
    }
}

#[async_trait]
impl Engine for LoopbackEngine {
    type Session = LoopbackSession;

    async fn has_block(&self, id: Link, bytes: Vec<u8>) -> Result<()> {
        let mut table = self.table.lock().expect("loopback table poisoned");
        let _ignored = table.insert(id, bytes);
        Ok(())
    }

    async fn new_session(
        &self,
        cancel: CancellationToken,
    ) -> Result<(Self::Session, mpsc::Receiver<RawBlock>)> {
        let (tx, rx) = mpsc::channel(100);
        Ok((
            LoopbackSession {
                table: Arc::clone(&self.table),
                sink: tx,
                cancel,
            },
            rx,
        ))
    }
}

#[derive(Debug)]
pub struct LoopbackSession {
    table: Arc<Mutex<HashMap<Link, Vec<u8>>>>,
    sink: mpsc::Sender<RawBlock>,
    cancel: CancellationToken,
}

#[async_trait]
impl Session for LoopbackSession {
    async fn get_blocks(&mut self, ids: Vec<Link>) -> Result<()> {
        for id in ids {
            let found = {
                let table = self.table.lock().expect("loopback table poisoned");
                table.get(&id).cloned()
            };
            if let Some(bytes) = found {
                if self.cancel.is_cancelled() {
                    return Ok(());
                }
                let _ignored = self.sink.send(RawBlock { id, bytes }).await;
            }
        }
        Ok(())
    }
}
