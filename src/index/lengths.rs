use std::ops::Range;
use std::path::Path;

use crate::error::{Error, Result, Unsupported};
use crate::index::{ExtentsIterator, ExtentsReader};
use crate::iterator::{
    Annotate, AnnotatedNode, CandidateIterator, ExtentIterator, LengthIterator,
};
use crate::types::DocId;

/// Field lengths derived from field extents: the length of a field in a
/// document is the number of positions its extents cover.
pub struct FieldLengthsReader {
    reader: ExtentsReader,
    field: String,
}

impl FieldLengthsReader {
    pub fn new(reader: ExtentsReader, field: &str) -> Self {
        FieldLengthsReader {
            reader,
            field: field.to_string(),
        }
    }

    pub fn open(dir: &Path, field: &str) -> Result<Self> {
        Ok(FieldLengthsReader::new(ExtentsReader::open(dir)?, field))
    }

    pub fn set_field(&mut self, field: &str) {
        self.field = field.to_string();
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Length of the configured field in `document`; zero if the document
    /// has no extents for it.
    pub fn length(&self, document: DocId) -> Result<u64> {
        let mut lengths = self.lengths_iterator()?;
        lengths.sync_to(document)?;
        Ok(lengths.length_at(document))
    }

    pub fn lengths_iterator(&self) -> Result<FieldLengthIterator> {
        self.lengths_iterator_for(&self.field)
    }

    pub fn lengths_iterator_for(&self, field: &str) -> Result<FieldLengthIterator> {
        self.reader
            .extents_iterator(field)?
            .map(FieldLengthIterator::new)
            .ok_or_else(|| Error::UnknownTerm(field.to_string()))
    }

    /// Lengths are not addressable as query operators.
    pub fn node_types(&self) -> Result<&'static [&'static str]> {
        Err(Unsupported::NodeTypes { reader: "lengths" }.into())
    }
}

/// Walks the documents of a field, reporting each one's length.
pub struct FieldLengthIterator {
    extents: ExtentsIterator,
}

impl FieldLengthIterator {
    pub fn new(extents: ExtentsIterator) -> Self {
        FieldLengthIterator { extents }
    }

    pub fn field(&self) -> &str {
        self.extents.term()
    }
}

impl CandidateIterator for FieldLengthIterator {
    fn current_candidate(&self) -> DocId {
        self.extents.current_candidate()
    }

    fn is_done(&self) -> bool {
        self.extents.is_done()
    }

    fn sync_to(&mut self, document: DocId) -> Result<()> {
        self.extents.sync_to(document)
    }

    fn move_past(&mut self, document: DocId) -> Result<()> {
        self.extents.move_past(document)
    }

    fn next(&mut self) -> Result<()> {
        self.extents.next()
    }

    fn total_entries(&self) -> u64 {
        self.extents.total_entries()
    }

    fn reset(&mut self) -> Result<()> {
        self.extents.reset()
    }

    fn id_range(&self) -> Option<Range<DocId>> {
        self.extents.id_range()
    }
}

impl LengthIterator for FieldLengthIterator {
    fn current_length(&self) -> u64 {
        self.extents.extents().total_length()
    }
}

impl Annotate for FieldLengthIterator {
    fn annotate(&self, document: DocId) -> Result<AnnotatedNode> {
        Ok(AnnotatedNode {
            operator: "lengths".into(),
            class_name: "FieldLengthIterator".into(),
            parameters: self.field().to_string(),
            document: self.current_candidate(),
            at_candidate: self.has_match(document),
            value: self.length_at(document).to_string(),
            children: vec![self.extents.annotate(document)?],
        })
    }
}
