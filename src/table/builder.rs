use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::bloom::builder::BloomFilterBuilder;
use crate::error::{Error, Result};
use crate::table::TableOptions;
use crate::table::block::builder::BlockBuilder;
use crate::table::footer::{BLOCK_TRAILER_SIZE, BlockHandle, Footer, IndexEntry};
use crate::table::manifest::Manifest;

/// Writes a table file from a strictly ascending stream of key-value pairs.
///
/// Build process:
/// 1. Add entries one by one (strictly ascending keys)
/// 2. Entries fill up blocks; a full block is written with its CRC32
/// 3. finish() flushes the last block, writes index, manifest, filter,
///    footer, fsync
pub struct TableBuilder {
    block_builder: BlockBuilder,
    index_entries: Vec<IndexEntry>,
    bloom: BloomFilterBuilder,
    /// Current write position in the file.
    offset: u64,
    writer: BufWriter<File>,
    block_size: usize,
    manifest: Manifest,
    /// Last key added; also the last key of the current block.
    last_key: Option<Vec<u8>>,
}

impl TableBuilder {
    pub fn new(path: &Path, options: TableOptions) -> Result<Self> {
        let file = File::create(path)?;
        Ok(TableBuilder {
            block_builder: BlockBuilder::new(options.block_size),
            index_entries: Vec::new(),
            bloom: BloomFilterBuilder::new(options.bloom_false_positive_rate),
            offset: 0,
            writer: BufWriter::new(file),
            block_size: options.block_size,
            manifest: Manifest::default(),
            last_key: None,
        })
    }

    /// Add a key-value pair. Keys must be strictly ascending.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.len() > u16::MAX as usize || value.len() > u32::MAX as usize {
            return Err(Error::InvalidInput(format!(
                "entry too large: key {} bytes, value {} bytes",
                key.len(),
                value.len()
            )));
        }
        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return Err(Error::InvalidInput(format!(
                    "keys out of order: {key:?} after {last:?}"
                )));
            }
        }

        if self.manifest.key_count == 0 {
            self.manifest.first_key = key.to_vec();
        }
        self.manifest.key_count += 1;
        self.bloom.add_key(key);

        if !self.block_builder.add(key, value) {
            self.flush_block()?;
            // A fresh block always accepts its first entry.
            self.block_builder.add(key, value);
        }
        self.last_key = Some(key.to_vec());
        Ok(())
    }

    /// Record a manifest property (segment range, statistics, ...).
    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) {
        self.manifest.properties.insert(name.to_string(), value.into());
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.block_builder.is_empty() {
            return Ok(());
        }
        let builder = std::mem::replace(&mut self.block_builder, BlockBuilder::new(self.block_size));
        let block = builder.build();
        let handle = self.write_block(&block)?;
        self.writer.write_all(&crc32fast::hash(&block).to_le_bytes())?;
        self.offset += BLOCK_TRAILER_SIZE;

        let last_key = self
            .last_key
            .clone()
            .ok_or_else(|| Error::Corruption("flushed a block with no last key".into()))?;
        self.index_entries.push(IndexEntry { last_key, handle });
        Ok(())
    }

    fn write_block(&mut self, data: &[u8]) -> Result<BlockHandle> {
        let handle = BlockHandle {
            offset: self.offset,
            size: data.len() as u64,
        };
        self.writer.write_all(data)?;
        self.offset += handle.size;
        Ok(handle)
    }

    /// Finalize the table and return its manifest.
    pub fn finish(mut self) -> Result<Manifest> {
        self.flush_block()?;
        self.manifest.last_key = self.last_key.take().unwrap_or_default();

        let index_data: Vec<u8> = self.index_entries.iter().flat_map(IndexEntry::encode).collect();
        let index = self.write_block(&index_data)?;
        let manifest = self.write_block(&self.manifest.encode()?)?;
        let bloom = std::mem::replace(&mut self.bloom, BloomFilterBuilder::new(0.5));
        let filter = self.write_block(&bloom.build().serialize())?;

        let footer = Footer {
            index,
            manifest,
            filter,
        };
        self.writer.write_all(&footer.encode())?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;

        debug!(
            keys = self.manifest.key_count,
            blocks = self.index_entries.len(),
            "table written"
        );
        Ok(self.manifest)
    }
}
