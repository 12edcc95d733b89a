use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::{DocId, decode_doc_key};

/// Declared start of a segment's document id range (inclusive).
pub const RANGE_START: &str = "rangeStart";
/// Declared end of a segment's document id range (exclusive).
pub const RANGE_END: &str = "rangeEnd";
/// Largest per-document extent count in an extents table.
pub const MAX_COUNT: &str = "maxCount";

/// Summary statistics stored alongside a table. Read-only once the table
/// is written, so it is shared freely between iterators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub key_count: u64,
    pub first_key: Vec<u8>,
    pub last_key: Vec<u8>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl Manifest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.properties.get(name).and_then(Value::as_u64)
    }

    /// The document id range this table covers.
    ///
    /// Segments declare their range through `rangeStart`/`rangeEnd`; tables
    /// without a declaration cover `[first key, last key + 1)`. An empty
    /// undeclared table covers nothing.
    pub fn doc_range(&self) -> Option<Range<DocId>> {
        if let (Some(start), Some(end)) = (self.get_u64(RANGE_START), self.get_u64(RANGE_END)) {
            return Some(start..end);
        }
        if self.key_count == 0 {
            return None;
        }
        let first = decode_doc_key(&self.first_key)?;
        let last = decode_doc_key(&self.last_key)?;
        Some(first..last.saturating_add(1))
    }
}
