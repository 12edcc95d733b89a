pub mod builder;

use crate::error::{Error, Result};

/// `[key_len(2B)][val_len(4B)]`
pub(crate) const ENTRY_HEADER_SIZE: usize = 6;
/// Trailing entry count.
pub(crate) const TRAILER_SIZE: usize = 4;

/// A decoded data block. Entries are located through the offset array, so
/// lookups binary search without parsing every entry.
#[derive(Debug, Clone)]
pub struct Block {
    data: Vec<u8>,
    offsets: Vec<u32>,
}

impl Block {
    /// Decode a block produced by `BlockBuilder::build`. Every entry is
    /// bounds-checked here so accessors never panic on corrupt input.
    pub fn decode(mut data: Vec<u8>) -> Result<Self> {
        if data.len() < TRAILER_SIZE {
            return Err(Error::Corruption("block too short".into()));
        }
        let count_at = data.len() - TRAILER_SIZE;
        let count = read_u32(&data, count_at) as usize;

        let offsets_len = count
            .checked_mul(4)
            .filter(|len| *len <= count_at)
            .ok_or_else(|| Error::Corruption(format!("block entry count {count} too large")))?;
        let entries_end = count_at - offsets_len;

        let offsets: Vec<u32> = (0..count)
            .map(|i| read_u32(&data, entries_end + i * 4))
            .collect();

        for &offset in &offsets {
            let start = offset as usize;
            if start + ENTRY_HEADER_SIZE > entries_end {
                return Err(Error::Corruption(format!("entry offset {start} out of bounds")));
            }
            let key_len = u16::from_le_bytes([data[start], data[start + 1]]) as usize;
            let val_len = read_u32(&data, start + 2) as usize;
            if start + ENTRY_HEADER_SIZE + key_len + val_len > entries_end {
                return Err(Error::Corruption(format!("entry at {start} truncated")));
            }
        }

        data.truncate(entries_end);
        Ok(Block { data, offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Key of entry `idx`. Panics if `idx >= len()`.
    pub fn key_at(&self, idx: usize) -> &[u8] {
        let (start, key_len, _) = self.entry_header(idx);
        &self.data[start..start + key_len]
    }

    /// Value of entry `idx`. Panics if `idx >= len()`.
    pub fn value_at(&self, idx: usize) -> &[u8] {
        let (start, key_len, val_len) = self.entry_header(idx);
        let value_start = start + key_len;
        &self.data[value_start..value_start + val_len]
    }

    /// Index of the first entry with key >= target (`len()` if none).
    pub fn seek_index(&self, target: &[u8]) -> usize {
        let mut lo = 0;
        let mut hi = self.offsets.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key_at(mid) < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Exact-match lookup.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let idx = self.seek_index(key);
        (idx < self.len() && self.key_at(idx) == key).then(|| self.value_at(idx))
    }

    /// (start of key, key_len, val_len)
    fn entry_header(&self, idx: usize) -> (usize, usize, usize) {
        let start = self.offsets[idx] as usize;
        let key_len = u16::from_le_bytes([self.data[start], self.data[start + 1]]) as usize;
        let val_len = read_u32(&self.data, start + 2) as usize;
        (start + ENTRY_HEADER_SIZE, key_len, val_len)
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}
