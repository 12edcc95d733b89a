use std::sync::Arc;

use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::table::block::Block;
use crate::table::reader::Table;

/// Forward cursor over a table's entries, loading one data block at a time.
///
/// Invariant: when valid, `block` is block `block_idx` and `entry < block.len()`.
pub struct TableCursor {
    table: Arc<Table>,
    block_idx: usize,
    block: Option<Block>,
    entry: usize,
}

impl TableCursor {
    pub(crate) fn new(table: Arc<Table>) -> Self {
        TableCursor {
            table,
            block_idx: 0,
            block: None,
            entry: 0,
        }
    }

    /// Position at the first entry of the table.
    pub fn seek_to_first(&mut self) -> Result<()> {
        self.load_block_from(0)
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Load the first non-empty block at or after `idx`, positioned at its
    /// first entry. Invalidates the cursor when no such block exists.
    fn load_block_from(&mut self, mut idx: usize) -> Result<()> {
        while idx < self.table.num_blocks() {
            let block = self.table.read_block(idx)?;
            if !block.is_empty() {
                self.block_idx = idx;
                self.block = Some(block);
                self.entry = 0;
                return Ok(());
            }
            idx += 1;
        }
        self.block = None;
        Ok(())
    }
}

impl StorageIterator for TableCursor {
    fn key(&self) -> &[u8] {
        match &self.block {
            Some(block) => block.key_at(self.entry),
            None => &[],
        }
    }

    fn value(&self) -> &[u8] {
        match &self.block {
            Some(block) => block.value_at(self.entry),
            None => &[],
        }
    }

    fn is_valid(&self) -> bool {
        self.block.is_some()
    }

    fn next(&mut self) -> Result<()> {
        let Some(block) = &self.block else {
            return Ok(());
        };
        if self.entry + 1 < block.len() {
            self.entry += 1;
            return Ok(());
        }
        self.load_block_from(self.block_idx + 1)
    }

    fn seek(&mut self, key: &[u8]) -> Result<()> {
        let Some(idx) = self.table.find_block(key) else {
            self.block = None;
            return Ok(());
        };

        // Stay on the loaded block when it is the target.
        if self.block_idx != idx || self.block.is_none() {
            self.load_block_from(idx)?;
        }
        let Some(block) = &self.block else {
            return Ok(());
        };
        let entry = block.seek_index(key);
        if entry < block.len() {
            self.entry = entry;
            Ok(())
        } else {
            self.load_block_from(self.block_idx + 1)
        }
    }
}
