use std::fmt;

use serde::Serialize;

/// Document identifier. Dense and ascending within a segment; globally
/// unique because segments own disjoint ranges.
pub type DocId = u64;

/// Sentinel returned by exhausted iterators. No stored candidate may take
/// this value, so exhausted iterators always sort last.
pub const MAX_DOC_ID: DocId = DocId::MAX;

/// Width of an encoded posting key.
pub const DOC_KEY_SIZE: usize = 8;

/// Encode a document id as a big-endian posting key.
///
/// Big-endian keeps lexicographic byte order equal to numeric order,
/// which is what the sorted table compares on.
pub fn encode_doc_key(document: DocId) -> [u8; DOC_KEY_SIZE] {
    document.to_be_bytes()
}

/// Decode a posting key. Returns None if the key is not exactly 8 bytes.
pub fn decode_doc_key(key: &[u8]) -> Option<DocId> {
    let bytes: [u8; DOC_KEY_SIZE] = key.try_into().ok()?;
    Some(DocId::from_be_bytes(bytes))
}

/// A half-open `[begin, end)` span of token positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub begin: u32,
    pub end: u32,
}

impl Extent {
    pub fn new(begin: u32, end: u32) -> Self {
        Extent { begin, end }
    }

    /// Number of positions covered. Inverted spans count as zero.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The extents recorded for one candidate document.
///
/// Encoded as `[count u32][begin u32][end u32]...`, all big-endian.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtentArray {
    extents: Vec<Extent>,
}

impl ExtentArray {
    pub const fn new() -> Self {
        ExtentArray {
            extents: Vec::new(),
        }
    }

    pub fn push(&mut self, begin: u32, end: u32) {
        self.extents.push(Extent::new(begin, end));
    }

    pub fn clear(&mut self) {
        self.extents.clear();
    }

    pub fn len(&self) -> usize {
        self.extents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extent> {
        self.extents.iter()
    }

    /// Sum of `end - begin` over every extent.
    pub fn total_length(&self) -> u64 {
        self.extents.iter().map(|e| e.len() as u64).sum()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.extents.len() * 8);
        buf.extend_from_slice(&(self.extents.len() as u32).to_be_bytes());
        for extent in &self.extents {
            buf.extend_from_slice(&extent.begin.to_be_bytes());
            buf.extend_from_slice(&extent.end.to_be_bytes());
        }
        buf
    }

    /// Decode a payload. A truncated or oversized payload yields None.
    pub fn decode(data: &[u8]) -> Option<Self> {
        let (count, rest) = data.split_first_chunk::<4>()?;
        let count = u32::from_be_bytes(*count) as usize;
        if rest.len() != count.checked_mul(8)? {
            return None;
        }
        let extents = rest
            .chunks_exact(8)
            .map(|chunk| {
                let begin = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let end = u32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
                Extent::new(begin, end)
            })
            .collect();
        Some(ExtentArray { extents })
    }
}

impl FromIterator<(u32, u32)> for ExtentArray {
    fn from_iter<T: IntoIterator<Item = (u32, u32)>>(iter: T) -> Self {
        ExtentArray {
            extents: iter.into_iter().map(|(b, e)| Extent::new(b, e)).collect(),
        }
    }
}

impl fmt::Display for ExtentArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, extent) in self.extents.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "[{},{})", extent.begin, extent.end)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_key_order_matches_numeric_order() {
        let ids = [0u64, 1, 255, 256, 65_535, 1 << 40, MAX_DOC_ID - 1];
        for pair in ids.windows(2) {
            assert!(encode_doc_key(pair[0]) < encode_doc_key(pair[1]));
        }
    }

    #[test]
    fn doc_key_rejects_wrong_width() {
        assert_eq!(decode_doc_key(&[0u8; 7]), None);
        assert_eq!(decode_doc_key(&encode_doc_key(42)), Some(42));
    }

    #[test]
    fn extents_total_length() {
        let extents: ExtentArray = [(0, 3), (10, 12), (20, 20)].into_iter().collect();
        assert_eq!(extents.total_length(), 5);
        assert_eq!(extents.to_string(), "[[0,3),[10,12),[20,20)]");
    }

    #[test]
    fn extents_decode_rejects_truncated() {
        let extents: ExtentArray = [(1, 2), (5, 9)].into_iter().collect();
        let encoded = extents.encode();
        assert_eq!(ExtentArray::decode(&encoded), Some(extents));
        assert_eq!(ExtentArray::decode(&encoded[..encoded.len() - 1]), None);
        assert_eq!(ExtentArray::decode(&[0, 0]), None);
    }
}
