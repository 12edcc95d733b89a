//! Typed readers over postings tables, and the disjoint index that merges
//! them across segments.

pub mod disjoint;
pub mod extents;
pub mod lengths;
pub mod names;

use crate::error::{Result, Unsupported};
use crate::iterator::CandidateIterator;
use crate::params::Node;

pub use disjoint::{DisjointIndex, Segment};
pub use extents::{ExtentsIterator, ExtentsReader};
pub use lengths::{FieldLengthIterator, FieldLengthsReader};
pub use names::{NameReader, NamesIterator};

/// A reader that serves a fixed set of query operators.
pub trait IndexPartReader {
    type Iterator: CandidateIterator;

    /// Name used in diagnostics and errors.
    const READER: &'static str;

    /// Operator strings this reader can serve.
    fn operators(&self) -> &'static [&'static str];

    /// Build the iterator for `node`. Unknown operators fail with
    /// `Unsupported::Operator`.
    fn iterator(&self, node: &Node) -> Result<Self::Iterator>;

    fn supports(&self, operator: &str) -> bool {
        self.operators().contains(&operator)
    }

    /// Reject `node` unless its operator is served here.
    fn check_operator(&self, node: &Node) -> Result<()> {
        if self.supports(&node.operator) {
            Ok(())
        } else {
            Err(Unsupported::Operator {
                reader: Self::READER,
                operator: node.operator.clone(),
            }
            .into())
        }
    }
}
