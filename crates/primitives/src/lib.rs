//! Shared primitives for the block-tree exchange coordinator: the
//! content-addressed [`Link`] type used to key blocks and name roots.

mod link;

pub use link::{Link, ParseLinkError, DIGEST_SIZE};
