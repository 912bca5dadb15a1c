//! Disk-resident B+ tree: node codecs, metadata block, and the tree engine.

mod internal;
mod leaf;
mod meta;
mod tree;

#[cfg(test)]
mod tests;

pub use internal::{InternalNode, INTERNAL_CAPACITY};
pub use leaf::{LeafLayout, LeafNode, LEAF_HEADER_LEN};
pub use meta::TreeMeta;
pub use tree::{BPlusTree, META_BLOCK};

use crate::error::{IndexError, Result};

/// Discriminates the two on-disk node formats.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum NodeKind {
    /// Leaf block holding records and the forward chain link.
    Leaf = 1,
    /// Internal block holding separator keys and child references.
    Internal = 2,
}

impl NodeKind {
    pub(crate) fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Leaf),
            2 => Ok(Self::Internal),
            other => Err(IndexError::Corruption(format!(
                "unknown node kind 0x{other:02X}"
            ))),
        }
    }
}
