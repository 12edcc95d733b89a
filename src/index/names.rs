use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, Unsupported};
use crate::index::IndexPartReader;
use crate::iterator::{Annotate, AnnotatedNode, CandidateIterator, NameIterator, ValueIterator};
use crate::params::Node;
use crate::table::{Manifest, Table};
use crate::types::{DocId, encode_doc_key};

/// Reads a table mapping document id → document name.
///
/// Only the forward direction is stored; name → id needs a different
/// index structure and is rejected outright.
#[derive(Clone)]
pub struct NameReader {
    table: Arc<Table>,
}

impl NameReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(NameReader::from_table(Table::open(path)?))
    }

    pub fn from_table(table: Arc<Table>) -> Self {
        NameReader { table }
    }

    /// The stored name of `document`. Ids never written, and names that
    /// are not valid UTF-8, are absent.
    pub fn document_name(&self, document: DocId) -> Result<Option<String>> {
        let Some(bytes) = self.table.get(&encode_doc_key(document))? else {
            return Ok(None);
        };
        Ok(decode_name(document, bytes))
    }

    /// Always fails: this format only maps id → name.
    pub fn document_identifier(&self, _name: &str) -> Result<DocId> {
        Err(Unsupported::NameToIdentifier.into())
    }

    pub fn names_iterator(&self) -> Result<NamesIterator> {
        NamesIterator::new(Arc::clone(&self.table))
    }

    pub fn manifest(&self) -> &Manifest {
        self.table.manifest()
    }
}

impl IndexPartReader for NameReader {
    type Iterator = NamesIterator;

    const READER: &'static str = "names";

    fn operators(&self) -> &'static [&'static str] {
        &["names"]
    }

    fn iterator(&self, node: &Node) -> Result<NamesIterator> {
        self.check_operator(node)?;
        self.names_iterator()
    }
}

fn decode_name(document: DocId, bytes: Vec<u8>) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(name) => Some(name),
        Err(err) => {
            warn!(document, error = %err, "document name is not valid UTF-8");
            None
        }
    }
}

/// Walks the names table in id order, exposing each candidate's name.
pub struct NamesIterator {
    values: ValueIterator,
    name: Option<String>,
}

impl NamesIterator {
    fn new(table: Arc<Table>) -> Result<Self> {
        let mut iter = NamesIterator {
            values: ValueIterator::new(table)?,
            name: None,
        };
        iter.load();
        Ok(iter)
    }

    fn load(&mut self) {
        let document = self.values.current_candidate();
        self.name = self
            .values
            .value()
            .and_then(|bytes| decode_name(document, bytes.to_vec()));
    }
}

impl CandidateIterator for NamesIterator {
    fn current_candidate(&self) -> DocId {
        self.values.current_candidate()
    }

    fn is_done(&self) -> bool {
        self.values.is_done()
    }

    fn sync_to(&mut self, document: DocId) -> Result<()> {
        if self.values.current_candidate() < document {
            self.values.sync_to(document)?;
            self.load();
        }
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        self.values.next()?;
        self.load();
        Ok(())
    }

    fn total_entries(&self) -> u64 {
        self.values.total_entries()
    }

    fn reset(&mut self) -> Result<()> {
        self.values.reset()?;
        self.load();
        Ok(())
    }

    fn id_range(&self) -> Option<Range<DocId>> {
        self.values.id_range()
    }
}

impl NameIterator for NamesIterator {
    fn current_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Annotate for NamesIterator {
    fn annotate(&self, document: DocId) -> Result<AnnotatedNode> {
        Ok(AnnotatedNode {
            operator: "names".into(),
            class_name: "NamesIterator".into(),
            parameters: String::new(),
            document: self.current_candidate(),
            at_candidate: self.has_match(document),
            value: self.name_at(document).unwrap_or_default().to_string(),
            children: Vec::new(),
        })
    }
}
