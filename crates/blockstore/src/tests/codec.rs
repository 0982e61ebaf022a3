use calimero_primitives::Link;

use super::*;

#[test]
fn round_trips_leaf_block() {
    let payload = b"hello, world".to_vec();
    let encoded = encode_block(&[], &payload);
    let decoded = decode_block(&encoded).unwrap();
    assert!(decoded.links.is_empty());
    assert_eq!(decoded.payload, payload);
}

#[test]
fn round_trips_interior_block() {
    let links = vec![Link::digest(b"a"), Link::digest(b"b"), Link::digest(b"c")];
    let encoded = encode_block(&links, &[]);
    let decoded = decode_block(&encoded).unwrap();
    assert_eq!(decoded.links, links);
    assert!(decoded.payload.is_empty());
}

#[test]
fn rejects_truncated_header() {
    let err = decode_block(&[1, 2, 3]).unwrap_err();
    assert_eq!(err, CodecError::TruncatedHeader(3));
}

#[test]
fn rejects_implausible_link_count() {
    // Declares u32::MAX links on a tiny buffer.
    let mut bytes = u32::MAX.to_le_bytes().to_vec();
    bytes.extend_from_slice(&0u32.to_le_bytes());
    let err = decode_block(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::ImplausibleLinkCount(_, _)));
}

#[test]
fn rejects_trailing_payload_mismatch() {
    let mut bytes = 0u32.to_le_bytes().to_vec();
    bytes.extend_from_slice(&5u32.to_le_bytes()); // claims 5 payload bytes
    bytes.extend_from_slice(b"ab"); // only supplies 2
    let err = decode_block(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::TrailingMismatch { .. }));
}

#[test]
fn links_per_block_is_pure_and_monotonic() {
    let small = links_per_block(64);
    let large = links_per_block(262_144);
    assert!(large > small);
    assert_eq!(links_per_block(64), links_per_block(64));
}

#[test]
fn links_per_block_matches_hand_computed_example() {
    // header(8) + K*32 <= 104 => K <= 3 exactly
    assert_eq!(links_per_block(104), 3);
}
