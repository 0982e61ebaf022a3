use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use calimero_blockstore::{decode_block, links_per_block, split_data_to_blocks, RootStatus, Storage};
use calimero_primitives::Link;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::CoordinatorConfig;
use crate::engine::{Engine, RawBlock, Session};
use crate::error::CoordinatorError;
use crate::state::{ChildParams, RootDownloadState};
use crate::upcall::{Command, ResourceUpdateKind, ResourceUpdated};

/// A running coordinator's handle: the host's only way to submit commands.
/// Dropping it closes the command channel, which the event loop treats
/// like global cancellation.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Splits `data` into a block tree and publishes it. Resolves once
    /// the coordinator has finished handling the command (successfully or
    /// not) — not once an `Added` upcall has necessarily been observed.
    pub async fn add(&self, data: Vec<u8>) -> eyre::Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Add { data, reply })
            .await
            .map_err(|_| eyre::eyre!("coordinator has shut down"))?;
        rx.await
            .map_err(|_| eyre::eyre!("coordinator dropped the reply channel"))
    }

    pub async fn delete(&self, root_ids: Vec<Link>) -> eyre::Result<()> {
        self.commands
            .send(Command::Delete { root_ids })
            .await
            .map_err(|_| eyre::eyre!("coordinator has shut down"))
    }

    pub async fn download(&self, root_ids: Vec<Link>) -> eyre::Result<()> {
        self.commands
            .send(Command::Download { root_ids })
            .await
            .map_err(|_| eyre::eyre!("coordinator has shut down"))
    }
}

/// Spawns a coordinator backed by `engine`/`storage`, returning a handle
/// to submit commands, the receiving end of its upcall channel, a token
/// to cancel it, and the loop's own join handle (its result is always
/// `Ok(())`: the loop is infallible and only ever returns on
/// cancellation or the handle being dropped).
pub fn spawn<E, S>(
    engine: Arc<E>,
    storage: Arc<S>,
    config: CoordinatorConfig,
) -> (
    CoordinatorHandle,
    mpsc::Receiver<ResourceUpdated>,
    CancellationToken,
    JoinHandle<()>,
)
where
    E: Engine,
    S: Storage,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(config.queue_capacity);
    let (block_tx, block_rx) = mpsc::channel(config.queue_capacity);
    let (deadline_tx, deadline_rx) = mpsc::channel(config.queue_capacity);
    let (upcall_tx, upcall_rx) = mpsc::channel(config.upcall_capacity);
    let global_cancel = CancellationToken::new();

    let coordinator = Coordinator {
        engine,
        storage,
        config,
        cmd_rx,
        block_tx,
        block_rx,
        deadline_tx,
        deadline_rx,
        upcalls: upcall_tx,
        global_cancel: global_cancel.clone(),
        root_states: HashMap::new(),
        child_params: HashMap::new(),
    };

    let handle = tokio::spawn(coordinator.run());

    (
        CoordinatorHandle { commands: cmd_tx },
        upcall_rx,
        global_cancel,
        handle,
    )
}

pub(crate) struct Coordinator<E: Engine, S: Storage> {
    engine: Arc<E>,
    storage: Arc<S>,
    config: CoordinatorConfig,

    cmd_rx: mpsc::Receiver<Command>,
    /// Cloned into every session's forwarding task; the loop only ever
    /// receives from `block_rx`.
    block_tx: mpsc::Sender<RawBlock>,
    block_rx: mpsc::Receiver<RawBlock>,
    deadline_tx: mpsc::Sender<Link>,
    deadline_rx: mpsc::Receiver<Link>,
    upcalls: mpsc::Sender<ResourceUpdated>,
    global_cancel: CancellationToken,

    root_states: HashMap<Link, RootDownloadState<E::Session>>,
    child_params: HashMap<Link, ChildParams>,
}

impl<E: Engine, S: Storage> Coordinator<E, S> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                () = self.global_cancel.cancelled() => {
                    debug!("coordinator: cancelled, shutting down");
                    return;
                }
                cmd = self.cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("coordinator: command channel closed, shutting down");
                        return;
                    };
                    self.handle_command(cmd).await;
                }
                block = self.block_rx.recv() => {
                    let Some(block) = block else { continue };
                    let mut queue = VecDeque::from([block]);
                    while let Some(item) = queue.pop_front() {
                        self.process_block(item, &mut queue).await;
                    }
                }
                root = self.deadline_rx.recv() => {
                    let Some(root) = root else { continue };
                    self.handle_deadline(root);
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Add { data, reply } => {
                self.handle_add(data).await;
                let _ignored = reply.send(());
            }
            Command::Delete { root_ids } => self.handle_delete(root_ids).await,
            Command::Download { root_ids } => {
                let mut seen = HashSet::new();
                for root in root_ids {
                    if seen.insert(root) {
                        self.kickstart(root).await;
                    }
                }
            }
        }
    }

    // ---- Add ------------------------------------------------------------

    async fn handle_add(&mut self, data: Vec<u8>) {
        let split = match split_data_to_blocks(self.config.max_block_size, &data) {
            Ok(split) => split,
            Err(err) => {
                error!(%err, "add: failed to split payload");
                return;
            }
        };

        if let Err(err) = self.storage.set_status(split.root, RootStatus::Partial).await {
            self.log_storage_fault(split.root, "add: mark partial", &err);
            return;
        }

        for (id, bytes) in split.blocks {
            if let Err(err) = self.storage.put_block(id, bytes.clone()).await {
                self.log_storage_fault(split.root, "add: store block", &err);
                return;
            }
            if let Err(err) = self.engine.has_block(id, bytes).await {
                error!(root = %split.root, block = %id, %err, "add: failed to publish block");
                return;
            }
        }

        if let Err(err) = self.storage.set_status(split.root, RootStatus::Full).await {
            self.log_storage_fault(split.root, "add: mark full", &err);
            return;
        }

        self.emit(ResourceUpdateKind::Added, vec![split.root]).await;
    }

    // ---- Download / kickstart --------------------------------------------

    async fn kickstart(&mut self, root: Link) {
        if self.child_params.contains_key(&root) {
            debug!(err = %CoordinatorError::DownloadInProgress { root }, "download: no-op");
            return;
        }

        match self.storage.get_status(root).await {
            Ok(Some(RootStatus::Full)) => {
                self.emit(ResourceUpdateKind::Added, vec![root]).await;
                return;
            }
            Ok(Some(RootStatus::Deleting)) => {
                debug!(%root, "download: root is being reclaimed, ignoring");
                return;
            }
            Ok(_) => {}
            Err(err) => {
                self.log_storage_fault(root, "download: read status", &err);
                return;
            }
        }

        if let Err(err) = self.storage.set_status(root, RootStatus::Partial).await {
            self.log_storage_fault(root, "download: mark partial", &err);
            return;
        }

        let cancel = self.global_cancel.child_token();
        let session = match self.engine.new_session(cancel.clone()).await {
            Ok((session, raw_rx)) => {
                self.spawn_forwarder(raw_rx);
                session
            }
            Err(err) => {
                error!(%root, %err, "download: failed to open session");
                return;
            }
        };

        self.child_params.insert(root, ChildParams { root, depth: 1 });
        let mut state = RootDownloadState::new(root, session, cancel.clone());

        match self.storage.view_block(root).await {
            Ok(Some(bytes)) => {
                let mut queue = VecDeque::from([RawBlock { id: root, bytes }]);
                self.root_states.insert(root, state);
                while let Some(item) = queue.pop_front() {
                    self.process_block(item, &mut queue).await;
                }
            }
            Ok(None) => {
                if let Err(err) = state.session.get_blocks(vec![root]).await {
                    error!(%root, %err, "download: failed to request root block");
                }
                self.root_states.insert(root, state);
            }
            Err(err) => {
                self.log_storage_fault(root, "download: read root block", &err);
                return;
            }
        }

        self.spawn_deadline_timer(root, cancel);
    }

    fn spawn_forwarder(&self, mut raw_rx: mpsc::Receiver<RawBlock>) {
        let sink = self.block_tx.clone();
        let _handle = tokio::spawn(async move {
            while let Some(block) = raw_rx.recv().await {
                if sink.send(block).await.is_err() {
                    break;
                }
            }
        });
    }

    fn spawn_deadline_timer(&self, root: Link, cancel: CancellationToken) {
        let deadline_tx = self.deadline_tx.clone();
        let timeout = self.config.root_download_timeout;
        let _handle = tokio::spawn(async move {
            tokio::select! {
                () = sleep(timeout) => {
                    let _ignored = deadline_tx.send(root).await;
                }
                () = cancel.cancelled() => {}
            }
        });
    }

    // ---- Block processing -------------------------------------------------

    async fn process_block(&mut self, block: RawBlock, queue: &mut VecDeque<RawBlock>) {
        let RawBlock { id, bytes } = block;

        let Some(params) = self.child_params.get(&id).copied() else {
            debug!(%id, "block delivery: no root expects this id, dropping");
            return;
        };

        if !self
            .root_states
            .get(&params.root)
            .is_some_and(|state| state.not_visited.contains(&id))
        {
            debug!(%id, root = %params.root, "block delivery: duplicate, dropping");
            return;
        }

        let under_max = bytes.len() < self.config.max_block_size;
        let check = self.check_structure(&params, under_max, &bytes);
        let decoded = match check {
            Ok(decoded) => decoded,
            Err(reason) => {
                self.report_malformed(params.root, reason).await;
                return;
            }
        };

        if let Err(err) = self.storage.put_block(id, bytes).await {
            self.log_storage_fault(params.root, "block processing: store block", &err);
            return;
        }

        let k = links_per_block(self.config.max_block_size);

        let is_leaf_level = {
            let state = self
                .root_states
                .get_mut(&params.root)
                .expect("root state present: checked above");

            let _ignored = state.not_visited.remove(&id);
            if under_max {
                state.processed_short_node = true;
            }

            if state.tree_depth == 0 && decoded.links.len() < k {
                state.tree_depth = if decoded.links.is_empty() {
                    params.depth
                } else {
                    params.depth + 1
                };
            }

            state.tree_depth == params.depth
        };

        if is_leaf_level && !decoded.links.is_empty() {
            self.report_malformed(params.root, "leaf-level block carries links".to_owned())
                .await;
            return;
        }

        let mut to_download = Vec::new();
        for &child in &decoded.links {
            if self.child_params.contains_key(&child) {
                self.report_malformed(params.root, format!("{child} referenced twice: not a tree"))
                    .await;
                return;
            }
            self.child_params.insert(
                child,
                ChildParams {
                    root: params.root,
                    depth: params.depth + 1,
                },
            );
            {
                let state = self
                    .root_states
                    .get_mut(&params.root)
                    .expect("root state present");
                let _ignored = state.not_visited.insert(child);
                let _ignored = state.all_descendants.insert(child);
            }

            match self.storage.view_block(child).await {
                Ok(Some(child_bytes)) => queue.push_back(RawBlock {
                    id: child,
                    bytes: child_bytes,
                }),
                Ok(None) => to_download.push(child),
                Err(err) => self.log_storage_fault(params.root, "block processing: read child", &err),
            }
        }

        if !to_download.is_empty() {
            let state = self
                .root_states
                .get_mut(&params.root)
                .expect("root state present");
            if let Err(err) = state.session.get_blocks(to_download).await {
                error!(root = %params.root, %err, "block processing: failed to request children");
            }
        }

        let done = self
            .root_states
            .get(&params.root)
            .is_some_and(|state| state.not_visited.is_empty());

        if done {
            if let Err(err) = self.storage.set_status(params.root, RootStatus::Full).await {
                self.log_storage_fault(params.root, "block processing: mark full", &err);
            }
            self.retire(params.root);
            self.emit(ResourceUpdateKind::Added, vec![params.root]).await;
        }
    }

    /// The structural checks from the block-processing contract. Returns
    /// the decoded block on success so the caller doesn't decode twice.
    fn check_structure(
        &self,
        params: &ChildParams,
        under_max: bool,
        bytes: &[u8],
    ) -> Result<calimero_blockstore::DecodedBlock, String> {
        if params.depth > self.config.max_block_tree_depth {
            return Err(format!(
                "depth {} exceeds max_block_tree_depth {}",
                params.depth, self.config.max_block_tree_depth
            ));
        }

        let decoded = decode_block(bytes).map_err(|err| format!("codec error: {err}"))?;

        let state = self
            .root_states
            .get(&params.root)
            .expect("root state present: checked by caller");

        if state.tree_depth != 0 {
            if params.depth > state.tree_depth {
                return Err(format!(
                    "depth {} exceeds known tree depth {}",
                    params.depth, state.tree_depth
                ));
            }
            if params.depth < state.tree_depth && under_max {
                return Err("non-max interior block".to_owned());
            }
        }

        if under_max && !decoded.links.is_empty() {
            return Err("under-max block carries links".to_owned());
        }

        if under_max && state.processed_short_node {
            return Err("second short block in tree".to_owned());
        }

        Ok(decoded)
    }

    async fn report_malformed(&mut self, root: Link, reason: String) {
        let err = CoordinatorError::MalformedBlock { root, reason };
        warn!(%err, "block: malformed, reclaiming root");
        self.retire(root);
        self.emit(ResourceUpdateKind::Broken, vec![root]).await;
    }

    fn log_storage_fault(&self, root: Link, context: &str, source: &eyre::Report) {
        let err = CoordinatorError::StorageFault {
            context: context.to_owned(),
            source: source.to_string(),
        };
        error!(%root, %err, "storage fault");
    }

    // ---- Free / retire ----------------------------------------------------

    /// Tears a root's bookkeeping down entirely: every descendant id is
    /// dropped from `child_params`, the root state is removed, and its
    /// session/timer are cancelled. Used both for the failure/timeout
    /// "free" path and, eagerly, on successful completion — once a root's
    /// state is gone, late arrivals are already harmless via the
    /// `child_params` lookup in `process_block`, so there is no
    /// observable difference between cancelling the session immediately
    /// and leaving it to idle.
    fn retire(&mut self, root: Link) {
        if let Some(state) = self.root_states.remove(&root) {
            for id in &state.all_descendants {
                let _ignored = self.child_params.remove(id);
            }
            state.cancel.cancel();
        } else {
            let _ignored = self.child_params.remove(&root);
        }
    }

    fn handle_deadline(&mut self, root: Link) {
        if self.root_states.contains_key(&root) {
            debug!(err = %CoordinatorError::DownloadTimeout { root }, "deadline: reclaiming root");
            self.retire(root);
        }
    }

    // ---- Delete -------------------------------------------------------

    async fn handle_delete(&mut self, root_ids: Vec<Link>) {
        let mut successes = Vec::new();

        for root in root_ids {
            if let Err(err) = self.storage.set_status(root, RootStatus::Deleting).await {
                self.log_storage_fault(root, "delete: mark deleting", &err);
                continue;
            }

            if self.child_params.contains_key(&root) {
                self.retire(root);
            }

            let mut to_visit = VecDeque::from([root]);
            let mut collected = Vec::new();
            let mut fault = false;

            while let Some(id) = to_visit.pop_front() {
                match self.storage.view_block(id).await {
                    Ok(Some(bytes)) => {
                        collected.push(id);
                        if let Ok(decoded) = decode_block(&bytes) {
                            to_visit.extend(decoded.links);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        self.log_storage_fault(root, "delete: read block", &err);
                        fault = true;
                        break;
                    }
                }
            }

            if fault {
                continue;
            }

            if let Err(err) = self.storage.delete_blocks(&collected).await {
                self.log_storage_fault(root, "delete: delete blocks", &err);
                continue;
            }

            if let Err(err) = self.storage.delete_status(root).await {
                self.log_storage_fault(root, "delete: clear status", &err);
                continue;
            }

            successes.push(root);
        }

        self.emit(ResourceUpdateKind::Removed, successes).await;
    }

    // ---- Upcalls ---------------------------------------------------------

    async fn emit(&self, kind: ResourceUpdateKind, roots: Vec<Link>) {
        if let Err(_rejected) = self.upcalls.try_send(ResourceUpdated {
            kind,
            roots: roots.clone(),
        }) {
            for root in roots {
                error!(err = %CoordinatorError::QueueFull { root }, "upcall dropped");
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/coordinator.rs"]
mod tests;
