pub mod annotated;
pub mod merge;
pub mod value;

use std::cmp::Ordering;
use std::ops::Range;

use crate::error::Result;
use crate::types::{DocId, ExtentArray};

pub use annotated::{Annotate, AnnotatedNode};
pub use merge::DisjointIterator;
pub use value::ValueIterator;

/// Byte-level iteration over a sorted data source.
///
/// Implemented by `TableCursor`; the postings iterators are built on top.
pub trait StorageIterator {
    /// Returns the current key. Only valid when is_valid() is true.
    fn key(&self) -> &[u8];

    /// Returns the current value. Only valid when is_valid() is true.
    fn value(&self) -> &[u8];

    /// Returns true if the iterator is positioned at a valid entry.
    fn is_valid(&self) -> bool;

    /// Advances to the next entry. Returns error on IO failure.
    fn next(&mut self) -> Result<()>;

    /// Positions the iterator at the first entry with key >= target.
    fn seek(&mut self, key: &[u8]) -> Result<()>;
}

/// The postings protocol every candidate iterator obeys.
///
/// `current_candidate()` never decreases except through `reset()`. Once
/// `is_done()`, it returns `MAX_DOC_ID`, so exhausted iterators sort last.
pub trait CandidateIterator {
    /// The document the cursor rests on, or `MAX_DOC_ID` when exhausted.
    fn current_candidate(&self) -> DocId;

    fn is_done(&self) -> bool;

    /// Advance to the first candidate >= `document`. A no-op when already
    /// there; never moves backward.
    fn sync_to(&mut self, document: DocId) -> Result<()>;

    /// Advance to the first candidate > `document`.
    fn move_past(&mut self, document: DocId) -> Result<()> {
        self.sync_to(document.saturating_add(1))
    }

    /// Step to the next candidate.
    fn next(&mut self) -> Result<()> {
        if self.is_done() {
            return Ok(());
        }
        let current = self.current_candidate();
        self.move_past(current)
    }

    /// True iff positioned exactly on `document`.
    fn has_match(&self, document: DocId) -> bool {
        !self.is_done() && self.current_candidate() == document
    }

    /// Number of postings in this iterator's key space.
    fn total_entries(&self) -> u64;

    /// Rewind to the first candidate.
    fn reset(&mut self) -> Result<()>;

    /// The document id range this iterator can ever produce, if known.
    fn id_range(&self) -> Option<Range<DocId>> {
        None
    }

    /// Total order by current candidate; exhausted iterators compare greatest.
    fn cmp_candidate(&self, other: &dyn CandidateIterator) -> Ordering {
        self.current_candidate().cmp(&other.current_candidate())
    }
}

/// Access to the extents of the current candidate.
pub trait ExtentIterator: CandidateIterator {
    /// Extents of the current candidate; empty when exhausted.
    fn extents(&self) -> &ExtentArray;
}

/// Occurrence counts for the current candidate.
pub trait CountIterator: CandidateIterator {
    fn count(&self) -> u32;

    /// Upper bound on `count()` over every candidate this iterator holds.
    fn maximum_count(&self) -> u32;
}

/// Document names for the current candidate.
pub trait NameIterator: CandidateIterator {
    fn current_name(&self) -> Option<&str>;

    /// The name of `document`, if the cursor is on it.
    fn name_at(&self, document: DocId) -> Option<&str> {
        if self.has_match(document) {
            self.current_name()
        } else {
            None
        }
    }
}

/// Field lengths for the current candidate.
pub trait LengthIterator: CandidateIterator {
    fn current_length(&self) -> u64;

    /// Length of `document`. Zero when the cursor is not on it: a missing
    /// field is an empty field.
    fn length_at(&self, document: DocId) -> u64 {
        if self.has_match(document) {
            self.current_length()
        } else {
            0
        }
    }
}
