use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::iterator::LengthIterator;
use crate::scoring::{DeltaScoringContext, DeltaScoringIterator};
use crate::types::{DocId, MAX_DOC_ID};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub document: DocId,
    pub score: f64,
}

/// Counters from the last `rank` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankerStats {
    /// Documents visited.
    pub candidates: u64,
    /// Documents scored by every iterator.
    pub scored: u64,
    /// Documents abandoned part way.
    pub pruned: u64,
    /// True if evaluation stopped before the postings ran out.
    pub early_stop: bool,
}

/// Min-heap of the best `k` documents. Ordered by score, then by lower
/// document id, so a later document has to strictly beat the k-th score.
struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<(OrderedFloat<f64>, Reverse<DocId>)>>,
}

impl TopK {
    fn new(k: usize) -> Self {
        TopK {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    /// Score a document must exceed to enter, once the heap is full.
    fn threshold(&self) -> Option<f64> {
        if self.heap.len() < self.k {
            return None;
        }
        self.heap.peek().map(|Reverse((score, _))| score.0)
    }

    fn offer(&mut self, document: DocId, score: f64) {
        self.heap.push(Reverse((OrderedFloat(score), Reverse(document))));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    fn into_sorted(self) -> Vec<ScoredDocument> {
        // into_sorted_vec is ascending in Reverse, i.e. best first.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse((score, Reverse(document)))| ScoredDocument {
                document,
                score: score.0,
            })
            .collect()
    }
}

/// Document-at-a-time top-k evaluation with per-document early termination.
///
/// Iterators are scored most selective first. Before each one the ranker
/// bounds what the document could still reach; once that cannot beat the
/// current k-th score the rest of the document is skipped.
pub struct MaxScoreRanker {
    k: usize,
    stats: RankerStats,
}

impl MaxScoreRanker {
    pub fn new(k: usize) -> Self {
        MaxScoreRanker {
            k,
            stats: RankerStats::default(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn stats(&self) -> RankerStats {
        self.stats
    }

    /// Top `k` documents by summed score, best first.
    pub fn rank<S, L>(&mut self, scorers: &mut [S], lengths: &mut L) -> Result<Vec<ScoredDocument>>
    where
        S: DeltaScoringIterator,
        L: LengthIterator,
    {
        self.stats = RankerStats::default();
        if self.k == 0 || scorers.is_empty() {
            return Ok(Vec::new());
        }

        let order = selectivity_order(scorers);
        let maxima: Vec<f64> = order
            .iter()
            .map(|&idx| {
                let mut context = DeltaScoringContext::new();
                scorers[idx].maximum_difference(&mut context);
                context.max_remaining
            })
            .collect();
        let best_possible = sequential_bound(0.0, &maxima);

        let mut top = TopK::new(self.k);
        let mut context = DeltaScoringContext::new();
        loop {
            let document = next_document(scorers);
            if document == MAX_DOC_ID {
                break;
            }
            if let Some(threshold) = top.threshold() {
                if best_possible <= threshold {
                    self.stats.early_stop = true;
                    break;
                }
            }
            self.stats.candidates += 1;

            lengths.sync_to(document)?;
            context.begin(document, lengths.length_at(document));

            let mut complete = true;
            for (pos, &idx) in order.iter().enumerate() {
                context.max_remaining = maxima[pos..].iter().sum();
                if let Some(threshold) = top.threshold() {
                    if sequential_bound(context.running_score, &maxima[pos..]) <= threshold {
                        complete = false;
                        break;
                    }
                }
                scorers[idx].score(&mut context);
            }

            if complete {
                self.stats.scored += 1;
                top.offer(document, context.running_score);
            } else {
                self.stats.pruned += 1;
            }

            for scorer in scorers.iter_mut() {
                scorer.move_past(document)?;
            }
        }

        debug!(
            k = self.k,
            candidates = self.stats.candidates,
            scored = self.stats.scored,
            pruned = self.stats.pruned,
            early_stop = self.stats.early_stop,
            "ranked"
        );
        Ok(top.into_sorted())
    }
}

/// Top `k` with every document fully scored. Scores are summed in the same
/// order as `MaxScoreRanker::rank`, so both agree exactly.
pub fn rank_exhaustive<S, L>(
    k: usize,
    scorers: &mut [S],
    lengths: &mut L,
) -> Result<Vec<ScoredDocument>>
where
    S: DeltaScoringIterator,
    L: LengthIterator,
{
    if k == 0 || scorers.is_empty() {
        return Ok(Vec::new());
    }
    let order = selectivity_order(scorers);
    let mut top = TopK::new(k);
    let mut context = DeltaScoringContext::new();
    loop {
        let document = next_document(scorers);
        if document == MAX_DOC_ID {
            break;
        }
        lengths.sync_to(document)?;
        context.begin(document, lengths.length_at(document));
        for &idx in &order {
            scorers[idx].score(&mut context);
        }
        top.offer(document, context.running_score);
        for scorer in scorers.iter_mut() {
            scorer.move_past(document)?;
        }
    }
    Ok(top.into_sorted())
}

fn selectivity_order<S: DeltaScoringIterator>(scorers: &[S]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scorers.len()).collect();
    order.sort_by_key(|&idx| scorers[idx].total_entries());
    order
}

fn next_document<S: DeltaScoringIterator>(scorers: &[S]) -> DocId {
    scorers
        .iter()
        .map(|scorer| scorer.current_candidate())
        .min()
        .unwrap_or(MAX_DOC_ID)
}

/// `running` plus each of `maxima`, added one at a time in scoring order.
///
/// Scores are accumulated the same way, and rounded addition is monotone,
/// so this never falls below the score it bounds. `running + sum` can.
fn sequential_bound(running: f64, maxima: &[f64]) -> f64 {
    maxima.iter().fold(running, |bound, max| bound + max)
}
