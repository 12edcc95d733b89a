use std::io;
use std::ops::Range;

use thiserror::Error;

use crate::types::DocId;

/// Unified error type for the postings engine.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error from disk operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Data corruption detected (CRC mismatch, bad format, etc).
    #[error("Corruption: {0}")]
    Corruption(String),
    /// The caller broke a writer contract (unsorted keys, oversized entry).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The on-disk format cannot serve the requested direction or operator.
    #[error("Unsupported operation: {0}")]
    Unsupported(#[from] Unsupported),
    /// A required query parameter could not be resolved at any layer.
    #[error(
        "Parameter `{parameter}` could not be annotated into node {node}; \
         specify it in the query parameters or global parameters"
    )]
    MissingParameter { parameter: String, node: String },
    /// A parameter is present but holds the wrong kind of value.
    #[error("Parameter `{parameter}` of node {node} must be {expected}")]
    InvalidParameter {
        parameter: String,
        node: String,
        expected: &'static str,
    },
    /// Two segments claim overlapping document id ranges.
    #[error("Overlapping segments: {first:?} and {second:?}")]
    OverlappingSegments {
        first: Range<DocId>,
        second: Range<DocId>,
    },
    /// Manifest or parameter JSON could not be (de)serialized.
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    /// No extents table exists for the requested term or field.
    #[error("Unknown term: {0}")]
    UnknownTerm(String),
}

/// Requests the on-disk format cannot satisfy. Raised at the first call site
/// that cannot comply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unsupported {
    #[error("this index file does not support document name -> identifier mappings")]
    NameToIdentifier,
    #[error("index `{reader}` does not support operator `{operator}`")]
    Operator {
        reader: &'static str,
        operator: String,
    },
    #[error("`{reader}` does not expose node types")]
    NodeTypes { reader: &'static str },
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_is_matchable() {
        let err: Error = Unsupported::NameToIdentifier.into();
        assert!(matches!(
            err,
            Error::Unsupported(Unsupported::NameToIdentifier)
        ));
    }

    #[test]
    fn missing_parameter_names_node() {
        let err = Error::MissingParameter {
            parameter: "k1".into(),
            node: "#bm25:default=cat()".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("k1"));
        assert!(msg.contains("#bm25"));
    }
}
