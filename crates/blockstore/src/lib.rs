//! The block codec, the tree splitter/joiner built on top of it, and the
//! [`Storage`] adapter trait a coordinator drives to persist blocks.

mod codec;
mod storage;
mod tree;

pub use codec::{decode_block, encode_block, links_per_block, max_leaf_payload, CodecError, DecodedBlock};
pub use storage::{MemoryStorage, RootStatus, Storage};
pub use tree::{join_blocks, split_data_to_blocks, JoinError, SplitResult, TreeError};
