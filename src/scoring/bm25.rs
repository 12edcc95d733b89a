use std::ops::Range;

use crate::error::{Error, Result};
use crate::iterator::{Annotate, AnnotatedNode, CandidateIterator, CountIterator};
use crate::params::Node;
use crate::scoring::{DeltaScoringIterator, ScoreIterator};
use crate::types::DocId;

/// BM25 parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f64,
    /// Length normalization, in [0, 1]
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.2, b: 0.75 }
    }
}

/// BM25 over a counts source (one term's postings).
///
/// Collection statistics arrive through the query node, so every segment's
/// scorer in a disjoint index scores against the same global numbers.
pub struct Bm25Iterator<I> {
    counts: I,
    params: Bm25Params,
    idf: f64,
    average_length: f64,
}

impl<I: CountIterator> Bm25Iterator<I> {
    /// Parameters `from_node` needs; resolve them with `ParameterResolver`.
    pub const REQUIRED_PARAMETERS: &'static [&'static str] = &[
        "documentCount",
        "collectionLength",
        "nodeDocumentCount",
        "k1",
        "b",
    ];

    pub fn new(
        counts: I,
        params: Bm25Params,
        document_count: u64,
        collection_length: u64,
        node_document_count: u64,
    ) -> Self {
        let n = document_count as f64;
        let df = node_document_count.min(document_count) as f64;
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
        let average_length = if document_count == 0 || collection_length == 0 {
            1.0
        } else {
            collection_length as f64 / n
        };
        Bm25Iterator {
            counts,
            params,
            idf,
            average_length,
        }
    }

    /// Build from an annotated node. Fails if a statistic is missing or a
    /// parameter is out of range.
    pub fn from_node(node: &Node, counts: I) -> Result<Self> {
        let k1 = node.require_double("k1")?;
        let b = node.require_double("b")?;
        if k1.is_nan() || k1 < 0.0 {
            return Err(invalid(node, "k1", "a non-negative number"));
        }
        if !(0.0..=1.0).contains(&b) {
            return Err(invalid(node, "b", "a number in [0, 1]"));
        }
        let document_count = require_count(node, "documentCount")?;
        let collection_length = require_count(node, "collectionLength")?;
        let node_document_count = require_count(node, "nodeDocumentCount")?;
        Ok(Bm25Iterator::new(
            counts,
            Bm25Params { k1, b },
            document_count,
            collection_length,
            node_document_count,
        ))
    }

    pub fn counts(&self) -> &I {
        &self.counts
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    fn weight(&self, tf: f64, length: u64) -> f64 {
        if tf <= 0.0 {
            return 0.0;
        }
        let Bm25Params { k1, b } = self.params;
        let norm = k1 * (1.0 - b + b * (length as f64 / self.average_length));
        self.idf * (tf * (k1 + 1.0)) / (tf + norm)
    }
}

fn require_count(node: &Node, name: &str) -> Result<u64> {
    let value = node.require_long(name)?;
    u64::try_from(value).map_err(|_| invalid(node, name, "a non-negative integer"))
}

fn invalid(node: &Node, name: &str, expected: &'static str) -> Error {
    Error::InvalidParameter {
        parameter: name.to_string(),
        node: node.to_string(),
        expected,
    }
}

impl<I: CountIterator> CandidateIterator for Bm25Iterator<I> {
    fn current_candidate(&self) -> DocId {
        self.counts.current_candidate()
    }

    fn is_done(&self) -> bool {
        self.counts.is_done()
    }

    fn sync_to(&mut self, document: DocId) -> Result<()> {
        self.counts.sync_to(document)
    }

    fn move_past(&mut self, document: DocId) -> Result<()> {
        self.counts.move_past(document)
    }

    fn next(&mut self) -> Result<()> {
        self.counts.next()
    }

    fn total_entries(&self) -> u64 {
        self.counts.total_entries()
    }

    fn reset(&mut self) -> Result<()> {
        self.counts.reset()
    }

    fn id_range(&self) -> Option<Range<DocId>> {
        self.counts.id_range()
    }
}

impl<I: CountIterator> ScoreIterator for Bm25Iterator<I> {
    fn score_at(&self, document: DocId, length: u64) -> f64 {
        let tf = if self.counts.has_match(document) {
            self.counts.count()
        } else {
            0
        };
        self.weight(tf as f64, length)
    }

    /// The weight grows with tf and shrinks with length, so the bound is
    /// the weight at the largest recorded count and a zero length.
    fn maximum_score(&self) -> f64 {
        let max_tf = self.counts.maximum_count() as f64;
        if max_tf <= 0.0 {
            return 0.0;
        }
        let Bm25Params { k1, b } = self.params;
        self.idf * (max_tf * (k1 + 1.0)) / (max_tf + k1 * (1.0 - b))
    }
}

impl<I: CountIterator> DeltaScoringIterator for Bm25Iterator<I> {}

impl<I: CountIterator + Annotate> Annotate for Bm25Iterator<I> {
    fn annotate(&self, document: DocId) -> Result<AnnotatedNode> {
        let tf = if self.has_match(document) {
            self.counts.count()
        } else {
            0
        };
        Ok(AnnotatedNode {
            operator: "bm25".into(),
            class_name: "Bm25Iterator".into(),
            parameters: format!("k1={},b={}", self.params.k1, self.params.b),
            document: self.current_candidate(),
            at_candidate: self.has_match(document),
            value: format!("tf={tf} max={:.4}", self.maximum_score()),
            children: vec![self.counts.annotate(document)?],
        })
    }
}
