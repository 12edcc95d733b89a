use std::ops::Range;

use tracing::trace;

use crate::error::{Error, Result};
use crate::iterator::{
    Annotate, AnnotatedNode, CandidateIterator, CountIterator, ExtentIterator, LengthIterator,
    NameIterator,
};
use crate::types::{DocId, ExtentArray, MAX_DOC_ID};

static NO_EXTENTS: ExtentArray = ExtentArray::new();

/// Presents iterators over disjoint document id ranges (one per segment)
/// as a single iterator over their union.
///
/// Exactly one constituent, the head, holds the smallest not-done
/// candidate. Reads and capability calls go to the head; movement is
/// applied to every constituent and the head is re-selected.
///
/// Ranges are validated at construction: overlapping constituents are
/// rejected with `Error::OverlappingSegments`.
pub struct DisjointIterator<I> {
    iterators: Vec<I>,
    head: Option<usize>,
}

impl<I: CandidateIterator> DisjointIterator<I> {
    pub fn new(iterators: Vec<I>) -> Result<Self> {
        check_disjoint(iterators.iter().filter_map(CandidateIterator::id_range))?;
        let mut merged = DisjointIterator {
            iterators,
            head: None,
        };
        merged.select_head();
        Ok(merged)
    }

    /// The constituent holding the current candidate.
    pub fn head(&self) -> Option<&I> {
        self.head.map(|idx| &self.iterators[idx])
    }

    pub fn iterators(&self) -> &[I] {
        &self.iterators
    }

    pub fn into_inner(self) -> Vec<I> {
        self.iterators
    }

    fn select_head(&mut self) {
        let head = self
            .iterators
            .iter()
            .enumerate()
            .filter(|(_, iter)| !iter.is_done())
            .min_by(|(_, a), (_, b)| a.cmp_candidate(*b))
            .map(|(idx, _)| idx);
        if head != self.head {
            trace!(from = ?self.head, to = ?head, "disjoint head changed");
        }
        self.head = head;
    }
}

/// Fail if any two ranges overlap. Empty ranges never conflict.
pub(crate) fn check_disjoint(ranges: impl Iterator<Item = Range<DocId>>) -> Result<()> {
    let mut ranges: Vec<Range<DocId>> = ranges.filter(|r| !r.is_empty()).collect();
    ranges.sort_by_key(|r| r.start);
    for pair in ranges.windows(2) {
        if pair[0].end > pair[1].start {
            return Err(Error::OverlappingSegments {
                first: pair[0].clone(),
                second: pair[1].clone(),
            });
        }
    }
    Ok(())
}

impl<I: CandidateIterator> CandidateIterator for DisjointIterator<I> {
    fn current_candidate(&self) -> DocId {
        self.head()
            .map_or(MAX_DOC_ID, CandidateIterator::current_candidate)
    }

    fn is_done(&self) -> bool {
        self.head.is_none()
    }

    /// On a failed read the head is still reselected, so the merged position
    /// agrees with the constituents that did move.
    fn sync_to(&mut self, document: DocId) -> Result<()> {
        let synced = self
            .iterators
            .iter_mut()
            .try_for_each(|iter| iter.sync_to(document));
        self.select_head();
        synced
    }

    /// Only the head can hold the current candidate, so only it moves.
    fn next(&mut self) -> Result<()> {
        let Some(idx) = self.head else {
            return Ok(());
        };
        let moved = self.iterators[idx].next();
        self.select_head();
        moved
    }

    fn total_entries(&self) -> u64 {
        self.iterators.iter().map(CandidateIterator::total_entries).sum()
    }

    fn reset(&mut self) -> Result<()> {
        let reset = self.iterators.iter_mut().try_for_each(CandidateIterator::reset);
        self.select_head();
        reset
    }

    fn id_range(&self) -> Option<Range<DocId>> {
        self.iterators
            .iter()
            .filter_map(CandidateIterator::id_range)
            .reduce(|a, b| a.start.min(b.start)..a.end.max(b.end))
    }
}

impl<I: ExtentIterator> ExtentIterator for DisjointIterator<I> {
    fn extents(&self) -> &ExtentArray {
        self.head().map_or(&NO_EXTENTS, |head| head.extents())
    }
}

impl<I: CountIterator> CountIterator for DisjointIterator<I> {
    fn count(&self) -> u32 {
        self.head().map_or(0, CountIterator::count)
    }

    /// Bound over every segment, not just the head's.
    fn maximum_count(&self) -> u32 {
        self.iterators
            .iter()
            .map(CountIterator::maximum_count)
            .max()
            .unwrap_or(0)
    }
}

impl<I: NameIterator> NameIterator for DisjointIterator<I> {
    fn current_name(&self) -> Option<&str> {
        self.head().and_then(|head| head.current_name())
    }
}

impl<I: LengthIterator> LengthIterator for DisjointIterator<I> {
    fn current_length(&self) -> u64 {
        self.head().map_or(0, LengthIterator::current_length)
    }
}

impl<I: CandidateIterator + Annotate> Annotate for DisjointIterator<I> {
    fn annotate(&self, document: DocId) -> Result<AnnotatedNode> {
        let children = self
            .iterators
            .iter()
            .map(|iter| iter.annotate(document))
            .collect::<Result<Vec<_>>>()?;

        let (operator, parameters, value) = match self.head.map(|idx| &children[idx]) {
            Some(head) => (head.operator.clone(), head.parameters.clone(), head.value.clone()),
            None => (
                children
                    .first()
                    .map_or_else(|| "disjoint".to_string(), |c| c.operator.clone()),
                String::new(),
                String::new(),
            ),
        };

        Ok(AnnotatedNode {
            operator,
            class_name: "DisjointIterator".into(),
            parameters,
            document: self.current_candidate(),
            at_candidate: self.has_match(document),
            value,
            children,
        })
    }
}
