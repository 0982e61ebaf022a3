//! Cross-crate scenarios exercising a coordinator through [`LocalNode`]
//! rather than its internals directly, in the style of `calimero-network`'s
//! own `tests/kad_modes.rs`.

use std::time::Duration;

use calimero_bitswap::CoordinatorConfig;
use calimero_blockstore::{encode_block, links_per_block, max_leaf_payload, RootStatus, Storage};
use calimero_node::{LocalNode, ResourceUpdateKind};
use calimero_primitives::Link;

const SMALL_MAX_BLOCK_SIZE: usize = 104;

fn small_config() -> CoordinatorConfig {
    CoordinatorConfig {
        max_block_size: SMALL_MAX_BLOCK_SIZE,
        max_block_tree_depth: 2,
        root_download_timeout: Duration::from_secs(600),
        queue_capacity: 100,
        upcall_capacity: 100,
    }
}

#[tokio::test]
async fn single_block_round_trip_across_two_peers() {
    let publisher = LocalNode::spawn(small_config());
    publisher.handle.add(b"hello".to_vec()).await.unwrap();
    let mut publisher_upcalls = publisher.upcalls;
    let added = publisher_upcalls.recv().await.unwrap();
    assert_eq!(added.kind, ResourceUpdateKind::Added);
    let root = added.roots[0];
    publisher.cancel.cancel();

    let downloader = LocalNode::spawn_on(publisher.engine, small_config());
    downloader.handle.download(vec![root]).await.unwrap();
    let mut downloader_upcalls = downloader.upcalls;
    let event = downloader_upcalls.recv().await.unwrap();
    assert_eq!(event.kind, ResourceUpdateKind::Added);
    assert_eq!(
        downloader.storage.get_status(root).await.unwrap(),
        Some(RootStatus::Full)
    );

    downloader.cancel.cancel();
}

#[tokio::test]
async fn balanced_two_level_tree_delivers_four_blocks() {
    let k = links_per_block(SMALL_MAX_BLOCK_SIZE);
    assert_eq!(k, 3);
    let leaf_max = max_leaf_payload(SMALL_MAX_BLOCK_SIZE);

    let publisher = LocalNode::spawn(small_config());
    publisher.handle.add(vec![9u8; leaf_max * k]).await.unwrap();
    let mut publisher_upcalls = publisher.upcalls;
    let root = publisher_upcalls.recv().await.unwrap().roots[0];
    publisher.cancel.cancel();

    let downloader = LocalNode::spawn_on(publisher.engine, small_config());
    downloader.handle.download(vec![root]).await.unwrap();
    let mut downloader_upcalls = downloader.upcalls;
    let event = downloader_upcalls.recv().await.unwrap();
    assert_eq!(event.kind, ResourceUpdateKind::Added);

    // Root plus its k max-size leaves: four blocks total now present.
    let root_bytes = downloader.storage.view_block(root).await.unwrap().unwrap();
    let leaves = calimero_blockstore::decode_block(&root_bytes).unwrap().links;
    assert_eq!(leaves.len(), k);
    for leaf in leaves {
        assert!(downloader.storage.view_block(leaf).await.unwrap().is_some());
    }

    downloader.cancel.cancel();
}

#[tokio::test]
async fn short_leaf_tree_downloads_cleanly() {
    let k = links_per_block(SMALL_MAX_BLOCK_SIZE);
    let leaf_max = max_leaf_payload(SMALL_MAX_BLOCK_SIZE);
    let data = vec![3u8; leaf_max * (k - 1) + 17];

    let publisher = LocalNode::spawn(small_config());
    publisher.handle.add(data).await.unwrap();
    let mut publisher_upcalls = publisher.upcalls;
    let root = publisher_upcalls.recv().await.unwrap().roots[0];
    publisher.cancel.cancel();

    let downloader = LocalNode::spawn_on(publisher.engine, small_config());
    downloader.handle.download(vec![root]).await.unwrap();
    let mut downloader_upcalls = downloader.upcalls;
    let event = downloader_upcalls.recv().await.unwrap();
    assert_eq!(event.kind, ResourceUpdateKind::Added);

    downloader.cancel.cancel();
}

#[tokio::test]
async fn malformed_interior_breaks_the_root() {
    let config = small_config();
    let leaf_max = max_leaf_payload(SMALL_MAX_BLOCK_SIZE);

    let node = LocalNode::spawn(config);

    let leaf1 = encode_block(&[], &vec![1u8; leaf_max]);
    let leaf1_id = Link::digest(&leaf1);
    node.engine.seed(leaf1_id, leaf1);
    let leaf2 = encode_block(&[], &vec![2u8; leaf_max]);
    let leaf2_id = Link::digest(&leaf2);
    node.engine.seed(leaf2_id, leaf2);
    let leaf3 = encode_block(&[], &vec![3u8; leaf_max]);
    let leaf3_id = Link::digest(&leaf3);
    node.engine.seed(leaf3_id, leaf3);

    // Non-max interior block: one link, but short of max size.
    let bad_mid = encode_block(&[leaf3_id], &[]);
    let bad_mid_id = Link::digest(&bad_mid);
    node.engine.seed(bad_mid_id, bad_mid);

    let root = encode_block(&[bad_mid_id, leaf1_id, leaf2_id], &[]);
    let root_id = Link::digest(&root);
    node.engine.seed(root_id, root);

    node.handle.download(vec![root_id]).await.unwrap();
    let mut upcalls = node.upcalls;
    let event = upcalls.recv().await.unwrap();
    assert_eq!(event.kind, ResourceUpdateKind::Broken);
    assert_eq!(event.roots, vec![root_id]);

    node.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn timeout_leaves_no_trace_and_allows_retry() {
    let mut config = small_config();
    config.root_download_timeout = Duration::from_secs(5);
    let node = LocalNode::spawn(config);

    let root_id = Link::digest(b"nobody has this");
    node.handle.download(vec![root_id]).await.unwrap();

    tokio::time::advance(Duration::from_secs(6)).await;
    tokio::task::yield_now().await;

    let mut upcalls = node.upcalls;
    assert!(
        tokio::time::timeout(Duration::from_millis(50), upcalls.recv())
            .await
            .is_err(),
        "a timed-out download must not emit an upcall"
    );

    let leaf = encode_block(&[], b"arrives on retry");
    let leaf_id = Link::digest(&leaf);
    node.engine.seed(leaf_id, leaf);
    node.handle.download(vec![leaf_id]).await.unwrap();
    let event = upcalls.recv().await.unwrap();
    assert_eq!(event.kind, ResourceUpdateKind::Added);

    node.cancel.cancel();
}

#[tokio::test]
async fn delete_reclaims_a_published_tree() {
    let k = links_per_block(SMALL_MAX_BLOCK_SIZE);
    let leaf_max = max_leaf_payload(SMALL_MAX_BLOCK_SIZE);
    let node = LocalNode::spawn(small_config());

    node.handle.add(vec![5u8; leaf_max * k]).await.unwrap();
    let mut upcalls = node.upcalls;
    let root = upcalls.recv().await.unwrap().roots[0];

    let root_bytes = node.storage.view_block(root).await.unwrap().unwrap();
    let leaves = calimero_blockstore::decode_block(&root_bytes).unwrap().links;
    assert_eq!(leaves.len(), k);
    for leaf in &leaves {
        assert!(node.storage.view_block(*leaf).await.unwrap().is_some());
    }

    node.handle.delete(vec![root]).await.unwrap();
    let removed = upcalls.recv().await.unwrap();
    assert_eq!(removed.kind, ResourceUpdateKind::Removed);
    assert_eq!(removed.roots, vec![root]);
    assert_eq!(node.storage.get_status(root).await.unwrap(), None);
    assert_eq!(node.storage.view_block(root).await.unwrap(), None);
    for leaf in &leaves {
        assert!(node.storage.view_block(*leaf).await.unwrap().is_none());
    }

    node.cancel.cancel();
}
