//! Sorted, immutable key-value table: the keyed store every postings
//! iterator reads from.
//!
//! ```text
//! ┌────────────┬─────┬────────────┬─────┬───────┬──────────┬────────┬────────┐
//! │ data block │ crc │ data block │ crc │ index │ manifest │ filter │ footer │
//! └────────────┴─────┴────────────┴─────┴───────┴──────────┴────────┴────────┘
//! ```

pub mod block;
pub mod builder;
pub mod cursor;
pub mod footer;
pub mod manifest;
pub mod reader;

pub use builder::TableBuilder;
pub use cursor::TableCursor;
pub use manifest::Manifest;
pub use reader::Table;

/// Knobs for writing tables.
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    /// Target data block size in bytes.
    pub block_size: usize,
    /// Bloom filter false positive rate.
    pub bloom_false_positive_rate: f64,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            block_size: 4096,
            bloom_false_positive_rate: 0.01,
        }
    }
}
