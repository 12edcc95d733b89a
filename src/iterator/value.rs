use std::ops::Range;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Error, Result};
use crate::iterator::{CandidateIterator, StorageIterator};
use crate::table::{Manifest, Table, TableCursor};
use crate::types::{DocId, MAX_DOC_ID, decode_doc_key, encode_doc_key};

/// Positions a table cursor by document id.
///
/// Keys are 8-byte big-endian document ids, so seeking the encoded id lands
/// on the first candidate >= it. The typed iterators (names, extents) wrap
/// this and decode `value()` whenever the position changes.
pub struct ValueIterator {
    cursor: TableCursor,
    /// Decoded key under the cursor, `MAX_DOC_ID` once exhausted.
    candidate: DocId,
}

impl ValueIterator {
    pub fn new(table: Arc<Table>) -> Result<Self> {
        let cursor = table.cursor()?;
        let mut iter = ValueIterator {
            cursor,
            candidate: MAX_DOC_ID,
        };
        iter.refresh()?;
        Ok(iter)
    }

    /// Raw value of the current candidate; None when exhausted, including
    /// on a stored key equal to the sentinel.
    pub fn value(&self) -> Option<&[u8]> {
        (!self.is_done()).then(|| self.cursor.value())
    }

    pub fn manifest(&self) -> &Manifest {
        self.cursor.table().manifest()
    }

    pub fn table(&self) -> &Arc<Table> {
        self.cursor.table()
    }

    /// Re-read the candidate after the cursor moved. A key that does not
    /// decode to a document id is a corrupt table, not exhaustion.
    fn refresh(&mut self) -> Result<()> {
        if !self.cursor.is_valid() {
            self.candidate = MAX_DOC_ID;
            return Ok(());
        }
        let key = self.cursor.key();
        let document = decode_doc_key(key).ok_or_else(|| {
            Error::Corruption(format!(
                "{}: posting key {key:?} is not a document id",
                self.table().path().display()
            ))
        })?;
        self.candidate = document;
        Ok(())
    }
}

impl CandidateIterator for ValueIterator {
    fn current_candidate(&self) -> DocId {
        self.candidate
    }

    fn is_done(&self) -> bool {
        self.candidate == MAX_DOC_ID
    }

    fn sync_to(&mut self, document: DocId) -> Result<()> {
        if self.candidate >= document {
            return Ok(());
        }
        trace!(from = self.candidate, to = document, "sync");
        self.cursor.seek(&encode_doc_key(document))?;
        self.refresh()
    }

    fn next(&mut self) -> Result<()> {
        if self.is_done() {
            return Ok(());
        }
        self.cursor.next()?;
        self.refresh()
    }

    fn total_entries(&self) -> u64 {
        self.manifest().key_count
    }

    fn reset(&mut self) -> Result<()> {
        self.cursor.seek_to_first()?;
        self.refresh()
    }

    fn id_range(&self) -> Option<Range<DocId>> {
        self.manifest().doc_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{TableBuilder, TableOptions};
    use tempfile::tempdir;

    fn build(dir: &std::path::Path, ids: &[DocId]) -> Arc<Table> {
        let path = dir.join("values.tbl");
        let mut builder = TableBuilder::new(
            &path,
            TableOptions {
                block_size: 64,
                ..Default::default()
            },
        )
        .unwrap();
        for id in ids {
            builder
                .add(&encode_doc_key(*id), format!("v{id}").as_bytes())
                .unwrap();
        }
        builder.finish().unwrap();
        Table::open(&path).unwrap()
    }

    #[test]
    fn sync_to_never_moves_backward() {
        let dir = tempdir().unwrap();
        let mut iter = ValueIterator::new(build(dir.path(), &[2, 4, 8, 16, 32])).unwrap();

        iter.sync_to(5).unwrap();
        assert_eq!(iter.current_candidate(), 8);
        iter.sync_to(3).unwrap();
        assert_eq!(iter.current_candidate(), 8);
        assert_eq!(iter.value(), Some(b"v8".as_slice()));

        iter.move_past(16).unwrap();
        assert_eq!(iter.current_candidate(), 32);
        iter.next().unwrap();
        assert!(iter.is_done());
        assert_eq!(iter.current_candidate(), MAX_DOC_ID);
        assert_eq!(iter.value(), None);

        iter.reset().unwrap();
        assert_eq!(iter.current_candidate(), 2);
    }

    #[test]
    fn sentinel_key_reads_as_exhausted() {
        let dir = tempdir().unwrap();
        let mut iter = ValueIterator::new(build(dir.path(), &[7, MAX_DOC_ID])).unwrap();
        assert_eq!(iter.value(), Some(b"v7".as_slice()));

        iter.next().unwrap();
        assert!(iter.is_done());
        assert_eq!(iter.value(), None);
    }

    #[test]
    fn corrupt_key_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.tbl");
        let mut builder = TableBuilder::new(&path, TableOptions::default()).unwrap();
        builder.add(b"short", b"x").unwrap();
        builder.finish().unwrap();

        let table = Table::open(&path).unwrap();
        assert!(matches!(
            ValueIterator::new(table),
            Err(Error::Corruption(_))
        ));
    }
}
