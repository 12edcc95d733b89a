use crate::error::{Error, Result};

/// Magic number identifying a postings table file.
pub const TABLE_MAGIC: u64 = 0x504F_5354_5442_4C00; // "POSTTBL\0"

/// Bytes of CRC32 written after every data block.
pub const BLOCK_TRAILER_SIZE: u64 = 4;

/// Location of one block inside the table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHandle {
    pub offset: u64,
    pub size: u64,
}

impl BlockHandle {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.offset.to_le_bytes());
        buf.extend_from_slice(&self.size.to_le_bytes());
    }

    fn decode(data: &[u8]) -> Self {
        BlockHandle {
            offset: read_u64(&data[0..8]),
            size: read_u64(&data[8..16]),
        }
    }
}

/// An entry in the table's index block. Maps a data block's last key to
/// its location. `size` excludes the 4-byte checksum trailing every block.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub last_key: Vec<u8>,
    pub handle: BlockHandle,
}

impl IndexEntry {
    /// Format: [key_len(2B)][key][offset(8B)][size(8B)]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + self.last_key.len() + 16);
        buf.extend_from_slice(&(self.last_key.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.last_key);
        self.handle.encode_into(&mut buf);
        buf
    }

    /// Decode an index entry, returning (entry, bytes_consumed).
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 2 {
            return Err(Error::Corruption("index entry too short".into()));
        }
        let key_len = u16::from_le_bytes([data[0], data[1]]) as usize;
        let total = 2 + key_len + 16;
        if data.len() < total {
            return Err(Error::Corruption("index entry truncated".into()));
        }
        let last_key = data[2..2 + key_len].to_vec();
        let handle = BlockHandle::decode(&data[2 + key_len..total]);
        Ok((IndexEntry { last_key, handle }, total))
    }
}

/// Fixed-size trailer locating the index, manifest and filter blocks.
///
/// ```text
/// ┌──────────────────────────────────────┐
/// │ Index block offset (8B) / size (8B)  │
/// │ Manifest offset (8B) / size (8B)     │
/// │ Filter offset (8B) / size (8B)       │
/// │ Magic number (8B)                    │
/// └──────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    pub index: BlockHandle,
    pub manifest: BlockHandle,
    pub filter: BlockHandle,
}

impl Footer {
    pub const SIZE: usize = 8 * 7;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        self.index.encode_into(&mut buf);
        self.manifest.encode_into(&mut buf);
        self.filter.encode_into(&mut buf);
        buf.extend_from_slice(&TABLE_MAGIC.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::Corruption("footer too short".into()));
        }
        let magic = read_u64(&data[48..56]);
        if magic != TABLE_MAGIC {
            return Err(Error::Corruption(format!(
                "bad magic: expected {TABLE_MAGIC:#x}, got {magic:#x}"
            )));
        }
        Ok(Footer {
            index: BlockHandle::decode(&data[0..16]),
            manifest: BlockHandle::decode(&data[16..32]),
            filter: BlockHandle::decode(&data[32..48]),
        })
    }

    /// Check that every block lies before the footer.
    pub fn validate(&self, file_size: u64) -> Result<()> {
        let data_end = file_size - Self::SIZE as u64;
        for (name, handle) in [
            ("index", self.index),
            ("manifest", self.manifest),
            ("filter", self.filter),
        ] {
            let end = handle.offset.checked_add(handle.size);
            if end.is_none_or(|end| end > data_end) {
                return Err(Error::Corruption(format!(
                    "{name} block {handle:?} exceeds file size {file_size}"
                )));
            }
        }
        Ok(())
    }
}

fn read_u64(data: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Footer {
        Footer {
            index: BlockHandle {
                offset: 4096,
                size: 512,
            },
            manifest: BlockHandle {
                offset: 4608,
                size: 80,
            },
            filter: BlockHandle {
                offset: 4688,
                size: 24,
            },
        }
    }

    #[test]
    fn footer_roundtrip() {
        let encoded = sample().encode();
        assert_eq!(encoded.len(), Footer::SIZE);
        assert_eq!(Footer::decode(&encoded).unwrap(), sample());
    }

    #[test]
    fn footer_bad_magic() {
        let mut encoded = sample().encode();
        encoded[48] ^= 0xFF;
        assert!(matches!(
            Footer::decode(&encoded),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn footer_too_short() {
        assert!(Footer::decode(&[0u8; 10]).is_err());
    }

    #[test]
    fn footer_block_past_end_is_corrupt() {
        let footer = sample();
        assert!(footer.validate(4712 + Footer::SIZE as u64).is_ok());
        assert!(footer.validate(4700 + Footer::SIZE as u64).is_err());
    }

    #[test]
    fn index_entry_roundtrip() {
        let entry = IndexEntry {
            last_key: 42u64.to_be_bytes().to_vec(),
            handle: BlockHandle {
                offset: 0,
                size: 4096,
            },
        };
        let encoded = entry.encode();
        let (decoded, consumed) = IndexEntry::decode(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.last_key, entry.last_key);
        assert_eq!(decoded.handle, entry.handle);
    }
}
