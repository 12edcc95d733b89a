use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::types::DocId;

/// Debugging snapshot of an iterator tree at one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedNode {
    /// Operator served, e.g. `names` or `extents`.
    pub operator: String,
    pub class_name: String,
    pub parameters: String,
    /// Where the iterator currently rests.
    pub document: DocId,
    /// Whether that position is the document being inspected.
    pub at_candidate: bool,
    pub value: String,
    pub children: Vec<AnnotatedNode>,
}

impl AnnotatedNode {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{} {}({}) doc={} match={} value={}",
            "",
            self.operator,
            self.class_name,
            self.parameters,
            self.document,
            self.at_candidate,
            self.value,
            indent = depth * 2
        )?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for AnnotatedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// Iterators that can describe themselves for query-plan debugging.
pub trait Annotate {
    /// Snapshot relative to `document`, the document under inspection.
    fn annotate(&self, document: DocId) -> Result<AnnotatedNode>;
}
