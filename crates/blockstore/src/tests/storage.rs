use calimero_primitives::Link;

use super::*;

#[tokio::test]
async fn unknown_block_is_none() {
    let store = MemoryStorage::new();
    let id = Link::digest(b"nothing here");
    assert_eq!(store.view_block(id).await.unwrap(), None);
}

#[tokio::test]
async fn put_then_view_round_trips() {
    let store = MemoryStorage::new();
    let id = Link::digest(b"payload");
    store.put_block(id, b"payload".to_vec()).await.unwrap();
    assert_eq!(store.view_block(id).await.unwrap(), Some(b"payload".to_vec()));
}

#[tokio::test]
async fn delete_blocks_tolerates_missing_entries() {
    let store = MemoryStorage::new();
    let present = Link::digest(b"present");
    let missing = Link::digest(b"missing");
    store.put_block(present, b"present".to_vec()).await.unwrap();

    store.delete_blocks(&[present, missing]).await.unwrap();

    assert_eq!(store.view_block(present).await.unwrap(), None);
}

#[tokio::test]
async fn status_transitions_are_visible_immediately() {
    let store = MemoryStorage::new();
    let root = Link::digest(b"root");
    assert_eq!(store.get_status(root).await.unwrap(), None);

    store.set_status(root, RootStatus::Partial).await.unwrap();
    assert_eq!(store.get_status(root).await.unwrap(), Some(RootStatus::Partial));

    store.set_status(root, RootStatus::Full).await.unwrap();
    assert_eq!(store.get_status(root).await.unwrap(), Some(RootStatus::Full));

    store.delete_status(root).await.unwrap();
    assert_eq!(store.get_status(root).await.unwrap(), None);
}
