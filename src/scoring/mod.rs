//! Scoring iterators and the delta-scoring contract used for top-k pruning.
//!
//! A top-k evaluation keeps two sums per document in a
//! `DeltaScoringContext`: the true score accumulated from the iterators
//! already scored, and the largest amount the remaining iterators could
//! still add. If their sum cannot beat the k-th best score, the document
//! is abandoned without scoring the rest.

pub mod bm25;
pub mod ranker;

use crate::iterator::{CandidateIterator, DisjointIterator};
use crate::types::DocId;

pub use bm25::{Bm25Iterator, Bm25Params};
pub use ranker::{MaxScoreRanker, RankerStats, ScoredDocument, rank_exhaustive};

/// Per-query scoring state. Owned by the evaluation loop, never by an
/// iterator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaScoringContext {
    /// Document being scored.
    pub document: DocId,
    /// Its length, for length-normalized scorers.
    pub length: u64,
    /// True score accumulated so far.
    pub running_score: f64,
    /// Upper bound on what the not-yet-scored iterators can add.
    pub max_remaining: f64,
}

impl DeltaScoringContext {
    pub fn new() -> Self {
        DeltaScoringContext::default()
    }

    /// Start scoring `document`.
    pub fn begin(&mut self, document: DocId, length: u64) {
        self.document = document;
        self.length = length;
        self.running_score = 0.0;
        self.max_remaining = 0.0;
    }

    /// Best total `document` could still reach.
    pub fn upper_bound(&self) -> f64 {
        self.running_score + self.max_remaining
    }
}

/// An iterator that scores documents.
pub trait ScoreIterator: CandidateIterator {
    /// Score of `document` with the given length. Documents the iterator is
    /// not positioned on score as a zero-frequency match.
    fn score_at(&self, document: DocId, length: u64) -> f64;

    /// Upper bound on `score_at` over every document and length.
    fn maximum_score(&self) -> f64;
}

/// Incremental scoring with a sound upper bound on remaining contribution.
///
/// `total_entries()` (from `CandidateIterator`) lets the evaluator probe
/// selective iterators first.
pub trait DeltaScoringIterator: ScoreIterator {
    /// Fold this iterator's contribution for `context.document` into the
    /// running score.
    fn score(&self, context: &mut DeltaScoringContext) {
        context.running_score += self.score_at(context.document, context.length);
    }

    /// Fold the most this iterator could contribute to any document into
    /// `max_remaining`. Must never underestimate.
    fn maximum_difference(&self, context: &mut DeltaScoringContext) {
        context.max_remaining += self.maximum_score();
    }
}

/// Scores come from the head; bounds cover every segment, since the next
/// document may belong to any of them.
impl<I: ScoreIterator> ScoreIterator for DisjointIterator<I> {
    fn score_at(&self, document: DocId, length: u64) -> f64 {
        match self.head() {
            Some(head) => head.score_at(document, length),
            None => self
                .iterators()
                .first()
                .map_or(0.0, |iter| iter.score_at(document, length)),
        }
    }

    fn maximum_score(&self) -> f64 {
        self.iterators()
            .iter()
            .map(ScoreIterator::maximum_score)
            .fold(f64::NEG_INFINITY, f64::max)
            .max(0.0)
    }
}

impl<I: DeltaScoringIterator> DeltaScoringIterator for DisjointIterator<I> {}
