use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::index::{
    ExtentsIterator, ExtentsReader, FieldLengthIterator, FieldLengthsReader, NameReader,
    NamesIterator,
};
use crate::iterator::DisjointIterator;
use crate::iterator::merge::check_disjoint;
use crate::types::DocId;

/// Names table inside a segment directory.
pub const NAMES_FILE: &str = "names";
/// Extents directory inside a segment directory.
pub const EXTENTS_DIR: &str = "extents";

/// One immutable index segment: a names table and an extents directory,
/// covering a slice of the document id space.
pub struct Segment {
    dir: PathBuf,
    names: NameReader,
    extents: ExtentsReader,
    range: Range<DocId>,
}

impl Segment {
    pub fn open(dir: &Path) -> Result<Self> {
        let names = NameReader::open(&dir.join(NAMES_FILE))?;
        let extents = ExtentsReader::open(&dir.join(EXTENTS_DIR))?;
        let range = names.manifest().doc_range().unwrap_or(0..0);
        Ok(Segment {
            dir: dir.to_path_buf(),
            names,
            extents,
            range,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn range(&self) -> Range<DocId> {
        self.range.clone()
    }

    pub fn names(&self) -> &NameReader {
        &self.names
    }

    pub fn extents(&self) -> &ExtentsReader {
        &self.extents
    }
}

/// A horizontally partitioned index read as one: segments built one per
/// ingestion batch, each owning a disjoint id range, merged at read time.
pub struct DisjointIndex {
    segments: Vec<Segment>,
}

impl DisjointIndex {
    /// Open every segment and verify their ranges do not overlap.
    pub fn open<P: AsRef<Path>>(dirs: &[P]) -> Result<Self> {
        let segments = dirs
            .iter()
            .map(|dir| Segment::open(dir.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        DisjointIndex::from_segments(segments)
    }

    pub fn from_segments(mut segments: Vec<Segment>) -> Result<Self> {
        check_disjoint(segments.iter().map(Segment::range))?;
        segments.sort_by_key(|segment| segment.range.start);
        debug!(
            segments = segments.len(),
            ranges = ?segments.iter().map(Segment::range).collect::<Vec<_>>(),
            "assembled disjoint index"
        );
        Ok(DisjointIndex { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The segment whose range holds `document`.
    pub fn segment_for(&self, document: DocId) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|segment| segment.range.contains(&document))
    }

    /// Name lookup routed to the owning segment.
    pub fn document_name(&self, document: DocId) -> Result<Option<String>> {
        match self.segment_for(document) {
            Some(segment) => segment.names.document_name(document),
            None => Ok(None),
        }
    }

    /// Never supported; see `NameReader::document_identifier`.
    pub fn document_identifier(&self, name: &str) -> Result<DocId> {
        match self.segments.first() {
            Some(segment) => segment.names.document_identifier(name),
            None => Err(crate::error::Unsupported::NameToIdentifier.into()),
        }
    }

    pub fn names_iterator(&self) -> Result<DisjointIterator<NamesIterator>> {
        let iterators = self
            .segments
            .iter()
            .map(|segment| segment.names.names_iterator())
            .collect::<Result<Vec<_>>>()?;
        DisjointIterator::new(iterators)
    }

    /// Postings of `term` across all segments. Segments that never saw the
    /// term contribute nothing.
    pub fn extents_iterator(&self, term: &str) -> Result<DisjointIterator<ExtentsIterator>> {
        let mut iterators = Vec::new();
        for segment in &self.segments {
            match segment.extents.extents_iterator(term)? {
                Some(iter) => iterators.push(iter),
                None => debug!(term, segment = %segment.dir.display(), "term absent from segment"),
            }
        }
        DisjointIterator::new(iterators)
    }

    /// Lengths of `field` across all segments. Fails if no segment has it.
    pub fn lengths_iterator(&self, field: &str) -> Result<DisjointIterator<FieldLengthIterator>> {
        let mut iterators = Vec::new();
        for segment in &self.segments {
            let lengths = FieldLengthsReader::new(segment.extents.clone(), field);
            match lengths.lengths_iterator() {
                Ok(iter) => iterators.push(iter),
                Err(Error::UnknownTerm(_)) => {
                    warn!(field, segment = %segment.dir.display(), "field absent from segment");
                }
                Err(err) => return Err(err),
            }
        }
        if iterators.is_empty() && !self.segments.is_empty() {
            return Err(Error::UnknownTerm(field.to_string()));
        }
        DisjointIterator::new(iterators)
    }
}
