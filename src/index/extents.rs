use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::index::IndexPartReader;
use crate::iterator::{
    Annotate, AnnotatedNode, CandidateIterator, CountIterator, ExtentIterator, ValueIterator,
};
use crate::params::Node;
use crate::table::manifest::MAX_COUNT;
use crate::table::{Manifest, Table};
use crate::types::{DocId, ExtentArray};

/// File extension of a per-term extents table.
pub const EXTENTS_SUFFIX: &str = "ext";

/// A directory of extents tables, one per term (or field), each keyed by
/// document id with an encoded `ExtentArray` as the value.
#[derive(Clone)]
pub struct ExtentsReader {
    dir: PathBuf,
    tables: BTreeMap<String, Arc<Table>>,
}

impl ExtentsReader {
    /// Open every `<term>.ext` table in `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENTS_SUFFIX) {
                continue;
            }
            let Some(term) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            tables.insert(term.to_string(), Table::open(&path)?);
        }
        debug!(dir = %dir.display(), terms = tables.len(), "opened extents index");
        Ok(ExtentsReader {
            dir: dir.to_path_buf(),
            tables,
        })
    }

    /// Where the table for `term` lives inside `dir`.
    pub fn table_path(dir: &Path, term: &str) -> PathBuf {
        dir.join(format!("{term}.{EXTENTS_SUFFIX}"))
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.tables.contains_key(term)
    }

    pub fn manifest(&self, term: &str) -> Option<&Manifest> {
        self.tables.get(term).map(|table| table.manifest())
    }

    /// Iterator over the postings of `term`; None if the term has no table.
    pub fn extents_iterator(&self, term: &str) -> Result<Option<ExtentsIterator>> {
        self.tables
            .get(term)
            .map(|table| ExtentsIterator::new(term, Arc::clone(table)))
            .transpose()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl IndexPartReader for ExtentsReader {
    type Iterator = ExtentsIterator;

    const READER: &'static str = "extents";

    fn operators(&self) -> &'static [&'static str] {
        &["extents", "counts"]
    }

    fn iterator(&self, node: &Node) -> Result<ExtentsIterator> {
        self.check_operator(node)?;
        let term = node.require_string(crate::params::DEFAULT_PARAMETER)?;
        self.extents_iterator(term)?
            .ok_or_else(|| Error::UnknownTerm(term.to_string()))
    }
}

/// Postings of one term: the current candidate's extents and their count.
pub struct ExtentsIterator {
    term: String,
    values: ValueIterator,
    extents: ExtentArray,
    max_count: u32,
}

impl ExtentsIterator {
    fn new(term: &str, table: Arc<Table>) -> Result<Self> {
        let values = ValueIterator::new(table)?;
        // Without a recorded maximum the bound has to stay unlimited.
        let max_count = values
            .manifest()
            .get_u64(MAX_COUNT)
            .map_or(u32::MAX, |max| max.min(u32::MAX as u64) as u32);
        let mut iter = ExtentsIterator {
            term: term.to_string(),
            values,
            extents: ExtentArray::new(),
            max_count,
        };
        iter.load();
        Ok(iter)
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Decode the current value. A malformed payload is treated as absent.
    fn load(&mut self) {
        self.extents.clear();
        let Some(bytes) = self.values.value() else {
            return;
        };
        match ExtentArray::decode(bytes) {
            Some(extents) => self.extents = extents,
            None => warn!(
                term = %self.term,
                document = self.values.current_candidate(),
                bytes = bytes.len(),
                "malformed extent payload"
            ),
        }
    }
}

impl CandidateIterator for ExtentsIterator {
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

impl ExtentIterator for ExtentsIterator {
    fn extents(&self) -> &ExtentArray {
        &self.extents
    }
}

impl CountIterator for ExtentsIterator {
    fn count(&self) -> u32 {
        self.extents.len() as u32
    }

    fn maximum_count(&self) -> u32 {
        self.max_count
    }
}

impl Annotate for ExtentsIterator {
    fn annotate(&self, document: DocId) -> Result<AnnotatedNode> {
        Ok(AnnotatedNode {
            operator: "extents".into(),
            class_name: "ExtentsIterator".into(),
            parameters: self.term.clone(),
            document: self.current_candidate(),
            at_candidate: self.has_match(document),
            value: self.extents.to_string(),
            children: Vec::new(),
        })
    }
}
