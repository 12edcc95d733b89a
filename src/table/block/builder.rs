use crate::table::block::{ENTRY_HEADER_SIZE, TRAILER_SIZE};

/// Accumulates sorted key-value pairs and serializes them into a block.
///
/// On-disk layout of a block:
/// ```text
/// ┌───────────────────────────────────────────────────┐
/// │ Entry 0: [key_len(2B)][val_len(4B)][key][value]   │
/// │ Entry 1: ...                                      │
/// │ Entry N: ...                                      │
/// ├───────────────────────────────────────────────────┤
/// │ Offset array: [off_0(4B)][off_1(4B)]...[off_N(4B)]│
/// │ Num entries (4B)                                  │
/// └───────────────────────────────────────────────────┘
/// ```
///
/// Values are 4-byte length prefixed: an extent array for a long document
/// easily outgrows 64KiB. All integers are little-endian.
pub struct BlockBuilder {
    data: Vec<u8>,
    offsets: Vec<u32>,
    block_size: usize,
}

impl BlockBuilder {
    pub fn new(block_size: usize) -> Self {
        BlockBuilder {
            data: Vec::new(),
            offsets: Vec::new(),
            block_size,
        }
    }

    /// Add a key-value pair to the block.
    /// Returns false if the block is full. The first entry is always
    /// accepted, even if it exceeds block_size.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> bool {
        let entry_size = ENTRY_HEADER_SIZE + key.len() + value.len() + 4;
        if !self.offsets.is_empty() && self.estimated_size() + entry_size > self.block_size {
            return false;
        }

        self.offsets.push(self.data.len() as u32);
        self.data.extend_from_slice(&(key.len() as u16).to_le_bytes());
        self.data.extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.data.extend_from_slice(key);
        self.data.extend_from_slice(value);
        true
    }

    /// Finalize the block: append offset array and entry count.
    pub fn build(self) -> Vec<u8> {
        let mut block = self.data;
        for offset in &self.offsets {
            block.extend_from_slice(&offset.to_le_bytes());
        }
        block.extend_from_slice(&(self.offsets.len() as u32).to_le_bytes());
        block
    }

    /// Current size of the block if it were built now.
    pub fn estimated_size(&self) -> usize {
        self.data.len() + self.offsets.len() * 4 + TRAILER_SIZE
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
