//! Internal node codec: separator keys routing to child blocks.

use crate::error::{IndexError, Result};
use crate::pager::{BlockId, BLOCK_SIZE};

use super::NodeKind;

/// Bytes reserved at the front of an internal block.
pub const INTERNAL_HEADER_LEN: usize = 8;

const KEY_LEN: usize = 8;
const CHILD_REF_LEN: usize = 4;

/// Number of separator keys an internal block holds; one more child
/// reference than keys fits alongside them.
pub const INTERNAL_CAPACITY: usize =
    (BLOCK_SIZE - INTERNAL_HEADER_LEN - CHILD_REF_LEN) / (KEY_LEN + CHILD_REF_LEN);

const KEYS_OFFSET: usize = INTERNAL_HEADER_LEN;
const CHILDREN_OFFSET: usize = KEYS_OFFSET + INTERNAL_CAPACITY * KEY_LEN;

/// One internal block decoded into memory.
///
/// `children` always holds exactly one more entry than `keys`:
/// `children[i]` covers keys below `keys[i]`, the last child covers the rest.
#[derive(Clone, Debug)]
pub struct InternalNode {
    keys: Vec<i64>,
    children: Vec<BlockId>,
}

impl InternalNode {
    /// The one-key node installed as a new root after a root split.
    pub fn new_root(key: i64, left: BlockId, right: BlockId) -> Self {
        Self {
            keys: vec![key],
            children: vec![left, right],
        }
    }

    /// Decodes an internal node from a block image.
    pub fn read_from(data: &[u8]) -> Result<Self> {
        if data.len() < BLOCK_SIZE {
            return Err(IndexError::Corruption(
                "internal block shorter than expected".into(),
            ));
        }
        let kind = NodeKind::from_u8(data[0])?;
        if kind != NodeKind::Internal {
            return Err(IndexError::Corruption("expected an internal block".into()));
        }
        let count = u16::from_le_bytes([data[2], data[3]]) as usize;
        if count == 0 || count > INTERNAL_CAPACITY {
            return Err(IndexError::Corruption(format!(
                "internal key count {count} out of range"
            )));
        }
        let mut keys = Vec::with_capacity(count);
        for i in 0..count {
            let off = KEYS_OFFSET + i * KEY_LEN;
            keys.push(i64::from_le_bytes(
                data[off..off + KEY_LEN]
                    .try_into()
                    .expect("slice has exactly 8 bytes"),
            ));
        }
        let mut children = Vec::with_capacity(count + 1);
        for i in 0..=count {
            let off = CHILDREN_OFFSET + i * CHILD_REF_LEN;
            children.push(u32::from_le_bytes(
                data[off..off + CHILD_REF_LEN]
                    .try_into()
                    .expect("slice has exactly 4 bytes"),
            ));
        }
        Ok(Self { keys, children })
    }

    /// Encodes the node into a block image.
    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        if data.len() < BLOCK_SIZE {
            return Err(IndexError::Corruption(
                "internal block shorter than expected".into(),
            ));
        }
        if self.keys.is_empty() || self.keys.len() > INTERNAL_CAPACITY {
            return Err(IndexError::InvalidArgument(format!(
                "internal key count {} out of range",
                self.keys.len()
            )));
        }
        if self.children.len() != self.keys.len() + 1 {
            return Err(IndexError::InvalidArgument(
                "child count must be one more than key count".into(),
            ));
        }
        data[0] = NodeKind::Internal as u8;
        data[1] = 0;
        data[2..4].copy_from_slice(&(self.keys.len() as u16).to_le_bytes());
        data[4..8].fill(0);
        for (i, key) in self.keys.iter().enumerate() {
            let off = KEYS_OFFSET + i * KEY_LEN;
            data[off..off + KEY_LEN].copy_from_slice(&key.to_le_bytes());
        }
        for (i, child) in self.children.iter().enumerate() {
            let off = CHILDREN_OFFSET + i * CHILD_REF_LEN;
            data[off..off + CHILD_REF_LEN].copy_from_slice(&child.to_le_bytes());
        }
        Ok(())
    }

    /// Number of separator keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the node holds no keys; never true for a well-formed node.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The separator keys, strictly ascending.
    pub fn keys(&self) -> &[i64] {
        &self.keys
    }

    /// The child block references, one more than there are keys.
    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    /// Whether every key slot is occupied.
    pub fn is_full(&self) -> bool {
        self.keys.len() == INTERNAL_CAPACITY
    }

    /// Child slot covering `key`: the first separator strictly greater than
    /// `key`, or the last child when every separator is `<= key`.
    pub fn route(&self, key: i64) -> usize {
        self.keys
            .iter()
            .position(|&sep| key < sep)
            .unwrap_or(self.keys.len())
    }

    /// Block reference of the child covering `key`.
    pub fn child_for(&self, key: i64) -> BlockId {
        self.children[self.route(key)]
    }

    /// Inserts separator `key` at `pos` with `right_child` to its right,
    /// shifting later keys and children one slot right.
    pub fn insert_at(&mut self, pos: usize, key: i64, right_child: BlockId) -> Result<()> {
        if self.is_full() {
            return Err(IndexError::InvalidArgument(
                "insert into a full internal node".into(),
            ));
        }
        if pos > self.keys.len() {
            return Err(IndexError::InvalidArgument(format!(
                "slot {pos} is past the occupied range"
            )));
        }
        self.keys.insert(pos, key);
        self.children.insert(pos + 1, right_child);
        Ok(())
    }

    /// Splits a full node around a pending insert of `key`/`right_child` at
    /// `pos`. The middle of the combined key run moves up to the parent and
    /// lands in neither half; this node keeps the lower half, the returned
    /// node takes the upper half.
    pub fn split(
        &mut self,
        key: i64,
        right_child: BlockId,
        pos: usize,
    ) -> Result<(i64, InternalNode)> {
        if !self.is_full() {
            return Err(IndexError::InvalidArgument(
                "split requires a full internal node".into(),
            ));
        }
        if pos > self.keys.len() {
            return Err(IndexError::InvalidArgument(format!(
                "slot {pos} is past the occupied range"
            )));
        }
        let mut keys = std::mem::take(&mut self.keys);
        let mut children = std::mem::take(&mut self.children);
        keys.insert(pos, key);
        children.insert(pos + 1, right_child);

        let mid = keys.len() / 2;
        let promoted = keys[mid];
        let right_keys = keys.split_off(mid + 1);
        keys.truncate(mid);
        let right_children = children.split_off(mid + 1);

        self.keys = keys;
        self.children = children;
        let right = InternalNode {
            keys: right_keys,
            children: right_children,
        };
        Ok((promoted, right))
    }
}
