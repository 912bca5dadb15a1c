//! The tree engine: open/create/close, recursive insertion, point search.

use std::path::Path;

use tracing::{debug, trace};

use crate::error::Result;
use crate::pager::{BlockFile, BlockId};
use crate::record::{Record, TableSchema};

use super::internal::InternalNode;
use super::leaf::{LeafLayout, LeafNode};
use super::meta::TreeMeta;

/// Fixed location of the metadata block.
pub const META_BLOCK: BlockId = 0;

/// What a level of the tree reports back to its parent after an insert.
enum InsertOutcome {
    /// The subtree absorbed the record without changing shape.
    Absorbed,
    /// The node split; `promoted` separates it from the new `right` sibling.
    Split { promoted: i64, right: BlockId },
}

/// An open B+ tree index over one block file.
///
/// The handle owns the in-memory metadata for its whole lifetime and is the
/// single point of access to the tree; there is no shared or global state.
#[derive(Debug)]
pub struct BPlusTree {
    blocks: BlockFile,
    meta: TreeMeta,
    layout: LeafLayout,
}

impl BPlusTree {
    /// Creates a new index file at `path`: block 0 holds the metadata,
    /// block 1 an empty leaf that starts out as the root.
    pub fn create(path: &Path, schema: TableSchema) -> Result<Self> {
        let layout = LeafLayout::for_schema(&schema)?;
        let mut blocks = BlockFile::create(path)?;
        let meta_block = blocks.allocate_block()?;
        debug_assert_eq!(meta_block, META_BLOCK);
        let root = blocks.allocate_block()?;

        let meta = TreeMeta {
            root,
            height: 1,
            total_blocks: blocks.block_count() as u32,
            schema,
        };
        let mut tree = Self {
            blocks,
            meta,
            layout,
        };
        tree.write_leaf(root, &LeafNode::empty())?;
        tree.write_meta()?;
        tree.blocks.flush()?;
        debug!(path = %path.display(), root, "index.create");
        Ok(tree)
    }

    /// Opens an existing index file, validating the metadata block before
    /// any handle is produced.
    pub fn open(path: &Path) -> Result<Self> {
        let mut blocks = BlockFile::open(path)?;
        if blocks.block_count() == 0 {
            return Err(crate::error::IndexError::InvalidFormat(
                "file has no metadata block".into(),
            ));
        }
        let meta = blocks.with_block(META_BLOCK, |data| TreeMeta::read(data))?;
        let layout = LeafLayout::for_schema(&meta.schema)?;
        debug!(
            path = %path.display(),
            root = meta.root,
            height = meta.height,
            "index.open"
        );
        Ok(Self {
            blocks,
            meta,
            layout,
        })
    }

    /// Writes the metadata back to block 0 and flushes everything dirty.
    pub fn close(mut self) -> Result<()> {
        self.write_meta()?;
        self.blocks.flush()?;
        Ok(())
    }

    /// Node levels from root to leaf inclusive.
    pub fn height(&self) -> u32 {
        self.meta.height
    }

    /// Blocks allocated in the backing file so far.
    pub fn total_blocks(&self) -> u32 {
        self.meta.total_blocks
    }

    /// Block holding the current root node.
    pub fn root(&self) -> BlockId {
        self.meta.root
    }

    /// Schema of the records this tree stores.
    pub fn schema(&self) -> &TableSchema {
        &self.meta.schema
    }

    /// Leaf geometry derived from the schema.
    pub fn layout(&self) -> &LeafLayout {
        &self.layout
    }

    /// Inserts `record`, returning the block that ended up holding it.
    ///
    /// Descends to the covering leaf, splitting any node that overflows on
    /// the way back up; when the split reaches the root, a new internal
    /// root is installed over the old root and its new sibling and the
    /// tree grows one level.
    pub fn insert(&mut self, record: &Record) -> Result<BlockId> {
        self.meta.schema.validate(record)?;
        let key = self.meta.schema.key_of(record)?;
        let before = (self.meta.root, self.meta.height, self.meta.total_blocks);

        let root = self.meta.root;
        let height = self.meta.height;
        let (outcome, landed) = self.insert_at_level(root, height, key, record)?;

        if let InsertOutcome::Split { promoted, right } = outcome {
            let new_root = self.allocate()?;
            let node = InternalNode::new_root(promoted, root, right);
            self.write_internal(new_root, &node)?;
            self.meta.root = new_root;
            self.meta.height += 1;
            debug!(
                root = new_root,
                height = self.meta.height,
                "index.insert.grow_root"
            );
            self.write_meta()?;
            self.blocks.flush()?;
        } else if (self.meta.root, self.meta.height, self.meta.total_blocks) != before {
            self.write_meta()?;
        }
        Ok(landed)
    }

    /// Point lookup: descends by routing, then scans the covering leaf.
    pub fn search(&mut self, key: i64) -> Result<Option<Record>> {
        let mut current = self.meta.root;
        let mut level = self.meta.height;
        while level > 1 {
            let node = self.read_internal(current)?;
            current = node.child_for(key);
            level -= 1;
        }
        let leaf = self.read_leaf(current)?;
        Ok(leaf.find_key(key)?.cloned())
    }

    fn insert_at_level(
        &mut self,
        block: BlockId,
        level: u32,
        key: i64,
        record: &Record,
    ) -> Result<(InsertOutcome, BlockId)> {
        if level == 1 {
            self.insert_into_leaf(block, key, record)
        } else {
            self.insert_into_internal(block, level, key, record)
        }
    }

    fn insert_into_leaf(
        &mut self,
        block: BlockId,
        key: i64,
        record: &Record,
    ) -> Result<(InsertOutcome, BlockId)> {
        let mut leaf = self.read_leaf(block)?;
        let pos = leaf.find_insert_pos(key)?;
        if !leaf.is_full(&self.layout) {
            leaf.insert_at(pos, record.clone(), &self.layout)?;
            self.write_leaf(block, &leaf)?;
            return Ok((InsertOutcome::Absorbed, block));
        }

        let right_id = self.allocate()?;
        let (promoted, right) = leaf.split(record.clone(), pos, right_id, &self.layout)?;
        self.write_leaf(block, &leaf)?;
        self.write_leaf(right_id, &right)?;
        trace!(left = block, right = right_id, promoted, "index.insert.split_leaf");

        let landed = if pos < self.layout.split_point() {
            block
        } else {
            right_id
        };
        Ok((
            InsertOutcome::Split {
                promoted,
                right: right_id,
            },
            landed,
        ))
    }

    fn insert_into_internal(
        &mut self,
        block: BlockId,
        level: u32,
        key: i64,
        record: &Record,
    ) -> Result<(InsertOutcome, BlockId)> {
        let node = self.read_internal(block)?;
        let pos = node.route(key);
        let child = node.children()[pos];
        drop(node);

        let (child_outcome, landed) = self.insert_at_level(child, level - 1, key, record)?;
        let (promoted, right) = match child_outcome {
            InsertOutcome::Absorbed => return Ok((InsertOutcome::Absorbed, landed)),
            InsertOutcome::Split { promoted, right } => (promoted, right),
        };

        let mut node = self.read_internal(block)?;
        if !node.is_full() {
            node.insert_at(pos, promoted, right)?;
            self.write_internal(block, &node)?;
            return Ok((InsertOutcome::Absorbed, landed));
        }

        let right_id = self.allocate()?;
        let (up, new_right) = node.split(promoted, right, pos)?;
        self.write_internal(block, &node)?;
        self.write_internal(right_id, &new_right)?;
        trace!(
            left = block,
            right = right_id,
            promoted = up,
            "index.insert.split_internal"
        );
        Ok((
            InsertOutcome::Split {
                promoted: up,
                right: right_id,
            },
            landed,
        ))
    }

    /// Allocates a block and keeps the metadata's block counter in sync.
    fn allocate(&mut self) -> Result<BlockId> {
        let id = self.blocks.allocate_block()?;
        self.meta.total_blocks = self.blocks.block_count() as u32;
        Ok(id)
    }

    fn read_leaf(&mut self, block: BlockId) -> Result<LeafNode> {
        let schema = &self.meta.schema;
        let layout = &self.layout;
        self.blocks
            .with_block(block, |data| LeafNode::read_from(schema, layout, data))
    }

    fn write_leaf(&mut self, block: BlockId, leaf: &LeafNode) -> Result<()> {
        let schema = &self.meta.schema;
        let layout = &self.layout;
        self.blocks
            .with_block_mut(block, |data| leaf.write_to(schema, layout, data))
    }

    fn read_internal(&mut self, block: BlockId) -> Result<InternalNode> {
        self.blocks
            .with_block(block, |data| InternalNode::read_from(data))
    }

    fn write_internal(&mut self, block: BlockId, node: &InternalNode) -> Result<()> {
        self.blocks.with_block_mut(block, |data| node.write_to(data))
    }

    fn write_meta(&mut self) -> Result<()> {
        let meta = &self.meta;
        self.blocks.with_block_mut(META_BLOCK, |data| meta.write(data))
    }

    #[cfg(test)]
    pub(crate) fn leaf_at(&mut self, block: BlockId) -> Result<LeafNode> {
        self.read_leaf(block)
    }

    #[cfg(test)]
    pub(crate) fn internal_at(&mut self, block: BlockId) -> Result<InternalNode> {
        self.read_internal(block)
    }
}
