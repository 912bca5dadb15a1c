//! Block-oriented file layer: fixed 512-byte blocks behind an LRU cache.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::path::Path;

use lru::LruCache;

use crate::error::{IndexError, Result};

/// Size of one block; every node structure must serialize within this.
pub const BLOCK_SIZE: usize = 512;

/// Number of blocks kept resident before eviction kicks in.
pub const DEFAULT_CACHE_BLOCKS: usize = 256;

/// Identifier of a block within the backing file.
pub type BlockId = u32;

#[derive(Debug)]
struct Block {
    data: Vec<u8>,
    dirty: bool,
}

/// A file of fixed-size blocks with cached, scoped access.
///
/// Blocks are borrowed for the duration of one closure call and released on
/// every exit path; mutable access marks the block dirty. Dirty blocks are
/// written back when evicted from the cache and on [`BlockFile::flush`].
#[derive(Debug)]
pub struct BlockFile {
    file: File,
    cache: LruCache<BlockId, Block>,
    file_len: u64,
}

impl BlockFile {
    /// Creates (or truncates) the file at `path` with zero blocks.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::from_file(file)
    }

    /// Opens an existing block file; fails if `path` does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::from_file(file)
    }

    fn from_file(file: File) -> Result<Self> {
        let file_len = file.metadata()?.len();
        let cache_size = NonZeroUsize::new(DEFAULT_CACHE_BLOCKS).expect("cache size is non-zero");
        Ok(Self {
            file,
            cache: LruCache::new(cache_size),
            file_len,
        })
    }

    /// Number of blocks allocated so far.
    pub fn block_count(&self) -> usize {
        if self.file_len == 0 {
            0
        } else {
            ((self.file_len - 1) as usize / BLOCK_SIZE) + 1
        }
    }

    /// Appends a zeroed block and returns its id; ids increase monotonically.
    pub fn allocate_block(&mut self) -> Result<BlockId> {
        if self.file_len % BLOCK_SIZE as u64 != 0 {
            return Err(IndexError::Corruption(
                "backing file length is not block aligned".into(),
            ));
        }
        let id = BlockId::try_from(self.file_len / BLOCK_SIZE as u64)
            .map_err(|_| IndexError::InvalidArgument("block file is full".into()))?;
        let block = Block {
            data: vec![0; BLOCK_SIZE],
            dirty: true,
        };
        self.insert_into_cache(id, block)?;
        self.file_len += BLOCK_SIZE as u64;
        Ok(id)
    }

    /// Runs `f` over the contents of block `id`.
    pub fn with_block<F, T>(&mut self, id: BlockId, mut f: F) -> Result<T>
    where
        F: FnMut(&[u8]) -> Result<T>,
    {
        let block = self.fetch_block(id)?;
        f(&block.data)
    }

    /// Runs `f` over the contents of block `id` and marks it dirty.
    pub fn with_block_mut<F, T>(&mut self, id: BlockId, mut f: F) -> Result<T>
    where
        F: FnMut(&mut [u8]) -> Result<T>,
    {
        let block = self.fetch_block(id)?;
        let result = f(&mut block.data)?;
        block.dirty = true;
        Ok(result)
    }

    /// Writes every dirty block back to disk and syncs the file.
    pub fn flush(&mut self) -> Result<()> {
        let dirty: Vec<BlockId> = self
            .cache
            .iter()
            .filter_map(|(&id, block)| block.dirty.then_some(id))
            .collect();
        if dirty.is_empty() {
            return Ok(());
        }
        for &id in &dirty {
            let block = self.cache.peek(&id).expect("dirty block still cached");
            write_block_image(&mut self.file, id, &block.data)?;
        }
        self.file.sync_data()?;
        for id in dirty {
            if let Some(block) = self.cache.get_mut(&id) {
                block.dirty = false;
            }
        }
        Ok(())
    }

    fn fetch_block(&mut self, id: BlockId) -> Result<&mut Block> {
        if block_offset(id) >= self.file_len {
            return Err(IndexError::InvalidArgument(format!(
                "block {id} is beyond the end of the file"
            )));
        }
        if !self.cache.contains(&id) {
            let data = self.read_block_from_disk(id)?;
            self.insert_into_cache(id, Block { data, dirty: false })?;
        }
        Ok(self.cache.get_mut(&id).expect("block was just inserted"))
    }

    fn insert_into_cache(&mut self, id: BlockId, block: Block) -> Result<()> {
        if let Some((evicted_id, evicted)) = self.cache.push(id, block) {
            if evicted.dirty {
                write_block_image(&mut self.file, evicted_id, &evicted.data)?;
            }
        }
        Ok(())
    }

    fn read_block_from_disk(&mut self, id: BlockId) -> Result<Vec<u8>> {
        let offset = block_offset(id);
        let mut buf = vec![0u8; BLOCK_SIZE];
        if offset < self.file_len {
            self.file.seek(SeekFrom::Start(offset))?;
            let bytes_read = self.file.read(&mut buf)?;
            if bytes_read < buf.len() {
                buf[bytes_read..].fill(0);
            }
        }
        Ok(buf)
    }
}

fn block_offset(id: BlockId) -> u64 {
    u64::from(id) * BLOCK_SIZE as u64
}

fn write_block_image(file: &mut File, id: BlockId, data: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(block_offset(id)))?;
    file.write_all(data)?;
    Ok(())
}
