//! # Postings Engine
//!
//! Disk-backed postings iterators for a search index, read one segment at
//! a time or merged across segments that partition the document id space.
//!
//! ## Core idea
//! Every index part (names, extents, field lengths) is a sorted table keyed
//! by document id. Iterators over those tables share one protocol: a
//! monotonically advancing cursor over candidate documents. Segments built
//! from separate batches own disjoint id ranges, so a merged iterator only
//! has to track which segment holds the smallest candidate.
//!
//! ## Layout
//! - `table`: immutable sorted tables with checksummed blocks and a bloom filter
//! - `iterator`: the candidate protocol and capability traits
//! - `index`: readers for names, extents and lengths, and the disjoint index
//! - `scoring`: BM25 and the delta-scoring contract for top-k pruning
//! - `params`: query node parameters and their resolution

pub mod bloom;
pub mod error;
pub mod index;
pub mod iterator;
pub mod params;
pub mod scoring;
pub mod table;
pub mod types;

// Public re-exports for the top-level API
pub use error::{Error, Result};
pub use index::{DisjointIndex, ExtentsReader, FieldLengthsReader, NameReader};
pub use iterator::{CandidateIterator, DisjointIterator};
pub use params::{Node, Parameters};
pub use types::{DocId, MAX_DOC_ID};
