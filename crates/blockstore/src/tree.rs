use std::collections::HashMap;

use calimero_primitives::Link;
use thiserror::Error;

use crate::codec::{decode_block, encode_block, links_per_block, max_leaf_payload, CodecError};

/// The output of [`split_data_to_blocks`]: every block the tree is made of,
/// keyed by content id, and the root's id.
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub blocks: HashMap<Link, Vec<u8>>,
    pub root: Link,
    /// 1 for a single-block tree; each additional interior level adds 1.
    pub depth: usize,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    #[error("max_block_size {0} leaves no room for a single link")]
    MaxBlockSizeTooSmall(usize),
}

/// Splits `data` into a balanced k-ary tree of blocks, each at most
/// `max_block_size` bytes encoded, and returns every block plus the root's
/// content id. Deterministic: identical input yields an identical result.
pub fn split_data_to_blocks(max_block_size: usize, data: &[u8]) -> Result<SplitResult, TreeError> {
    let leaf_max = max_leaf_payload(max_block_size);

    let mut blocks = HashMap::new();
    let mut level: Vec<Link> = if data.is_empty() {
        vec![store_leaf(&mut blocks, &[])]
    } else {
        data.chunks(leaf_max.max(1))
            .map(|chunk| store_leaf(&mut blocks, chunk))
            .collect()
    };

    let mut depth = 1;
    if level.len() > 1 {
        let k = links_per_block(max_block_size);
        if k == 0 {
            return Err(TreeError::MaxBlockSizeTooSmall(max_block_size));
        }

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(k));
            for group in level.chunks(k) {
                next.push(store_interior(&mut blocks, group));
            }
            level = next;
            depth += 1;
        }
    }

    Ok(SplitResult {
        blocks,
        root: level[0],
        depth,
    })
}

fn store_leaf(blocks: &mut HashMap<Link, Vec<u8>>, payload: &[u8]) -> Link {
    let encoded = encode_block(&[], payload);
    let id = Link::digest(&encoded);
    let _ignored = blocks.insert(id, encoded);
    id
}

fn store_interior(blocks: &mut HashMap<Link, Vec<u8>>, links: &[Link]) -> Link {
    let encoded = encode_block(links, &[]);
    let id = Link::digest(&encoded);
    let _ignored = blocks.insert(id, encoded);
    id
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    #[error("block {0} missing from the supplied block set")]
    MissingBlock(Link),
    #[error("malformed block {0}: {1}")]
    Malformed(Link, CodecError),
}

/// Reassembles the payload of a tree given every one of its blocks and its
/// root id. The coordinator itself never calls this — deletion sweeps only
/// walk links, never bytes — but it is the formal inverse of
/// [`split_data_to_blocks`].
pub fn join_blocks(blocks: &HashMap<Link, Vec<u8>>, root: Link) -> Result<Vec<u8>, JoinError> {
    let bytes = blocks.get(&root).ok_or(JoinError::MissingBlock(root))?;
    let decoded = decode_block(bytes).map_err(|e| JoinError::Malformed(root, e))?;

    if decoded.links.is_empty() {
        return Ok(decoded.payload);
    }

    let mut out = Vec::new();
    for child in decoded.links {
        out.extend(join_blocks(blocks, child)?);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "tests/tree.rs"]
mod tests;
