use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::bloom::BloomFilter;
use crate::error::{Error, Result};
use crate::table::block::Block;
use crate::table::cursor::TableCursor;
use crate::table::footer::{BLOCK_TRAILER_SIZE, BlockHandle, Footer, IndexEntry};
use crate::table::manifest::Manifest;

/// An opened table file. Supports point lookups and positioned cursors.
///
/// On open:
/// 1. Read footer (last 56 bytes) → find index, manifest and filter blocks
/// 2. Read and parse the index block → Vec<IndexEntry>
/// 3. Read the manifest and bloom filter
/// 4. Ready for queries (data blocks read on demand)
///
/// A table is shared behind an `Arc`: every cursor holds a clone, and the
/// file closes when the last one is dropped.
pub struct Table {
    path: PathBuf,
    file: Mutex<File>,
    index: Vec<IndexEntry>,
    manifest: Manifest,
    filter: BloomFilter,
}

impl Table {
    pub fn open(path: &Path) -> Result<Arc<Self>> {
        let mut file = File::open(path)?;

        let file_size = file.metadata()?.len();
        if file_size < Footer::SIZE as u64 {
            return Err(Error::Corruption(format!(
                "{}: file too short to contain footer",
                path.display()
            )));
        }
        file.seek(SeekFrom::Start(file_size - Footer::SIZE as u64))?;
        let mut footer_buf = [0u8; Footer::SIZE];
        file.read_exact(&mut footer_buf)?;
        let footer = Footer::decode(&footer_buf)?;
        footer.validate(file_size)?;

        let index_buf = read_handle(&mut file, footer.index)?;
        let mut index = Vec::new();
        let mut offset = 0usize;
        while offset < index_buf.len() {
            let (entry, consumed) = IndexEntry::decode(&index_buf[offset..])?;
            index.push(entry);
            offset += consumed;
        }
        validate_index(&index, footer.index.offset)?;

        let manifest = Manifest::decode(&read_handle(&mut file, footer.manifest)?)?;
        let filter = BloomFilter::deserialize(&read_handle(&mut file, footer.filter)?)?;

        debug!(
            path = %path.display(),
            keys = manifest.key_count,
            blocks = index.len(),
            "opened table"
        );

        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            index,
            manifest,
            filter,
        }))
    }

    /// Point lookup.
    ///
    /// 1. Bloom filter → definitely absent keys cost nothing
    /// 2. Range check against the manifest's first/last key
    /// 3. Binary search the index for the block, read it, search it
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if !self.filter.may_contain(key) {
            return Ok(None);
        }
        if self.manifest.key_count == 0
            || key < self.manifest.first_key.as_slice()
            || key > self.manifest.last_key.as_slice()
        {
            return Ok(None);
        }
        let Some(block_idx) = self.find_block(key) else {
            return Ok(None);
        };
        let block = self.read_block(block_idx)?;
        Ok(block.get(key).map(<[u8]>::to_vec))
    }

    /// Index of the first block whose last key is >= key.
    pub(crate) fn find_block(&self, key: &[u8]) -> Option<usize> {
        let idx = self
            .index
            .partition_point(|entry| entry.last_key.as_slice() < key);
        (idx < self.index.len()).then_some(idx)
    }

    pub(crate) fn num_blocks(&self) -> usize {
        self.index.len()
    }

    /// Read, checksum and decode data block `idx`.
    pub(crate) fn read_block(&self, idx: usize) -> Result<Block> {
        let handle = self.index[idx].handle;
        let mut buf = vec![0u8; handle.size as usize + BLOCK_TRAILER_SIZE as usize];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(handle.offset))?;
            file.read_exact(&mut buf)?;
        }
        let stored = buf.split_off(handle.size as usize);
        let stored = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
        let actual = crc32fast::hash(&buf);
        if stored != actual {
            return Err(Error::Corruption(format!(
                "{}: block {idx} checksum mismatch (stored {stored:#x}, computed {actual:#x})",
                self.path.display()
            )));
        }
        Block::decode(buf)
    }

    /// A cursor positioned at the first entry.
    pub fn cursor(self: &Arc<Self>) -> Result<TableCursor> {
        let mut cursor = TableCursor::new(Arc::clone(self));
        cursor.seek_to_first()?;
        Ok(cursor)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Every data block, with its checksum trailer, must end before the index
/// block. The index carries no checksum of its own, so this is the only
/// guard against a corrupt size reaching an allocation.
fn validate_index(index: &[IndexEntry], data_end: u64) -> Result<()> {
    for (idx, entry) in index.iter().enumerate() {
        let end = entry
            .handle
            .offset
            .checked_add(entry.handle.size)
            .and_then(|end| end.checked_add(BLOCK_TRAILER_SIZE));
        if end.is_none_or(|end| end > data_end) {
            return Err(Error::Corruption(format!(
                "data block {idx} {:?} overruns the index block at {data_end}",
                entry.handle
            )));
        }
    }
    Ok(())
}

fn read_handle(file: &mut File, handle: BlockHandle) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(handle.offset))?;
    let mut buf = vec![0u8; handle.size as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}
