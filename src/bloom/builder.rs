use xxhash_rust::xxh3::xxh3_128;

use crate::bloom::BloomFilter;

/// Collects key hashes while a table is written, then sizes the filter
/// once the final key count is known.
pub struct BloomFilterBuilder {
    hashes: Vec<u128>,
    false_positive_rate: f64,
}

impl BloomFilterBuilder {
    pub fn new(false_positive_rate: f64) -> Self {
        BloomFilterBuilder {
            hashes: Vec::new(),
            false_positive_rate,
        }
    }

    /// Add a key to the bloom filter being built.
    pub fn add_key(&mut self, key: &[u8]) {
        self.hashes.push(xxh3_128(key));
    }

    /// Finalize and return the bloom filter. An empty table still gets a
    /// (minimum sized, all-zero) filter.
    pub fn build(self) -> BloomFilter {
        let mut filter = BloomFilter::new(self.hashes.len().max(1), self.false_positive_rate);
        for hash in self.hashes {
            filter.insert_hash(hash);
        }
        filter
    }
}
