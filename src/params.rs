//! Query nodes and their parameters.
//!
//! Parameters resolve in three layers: node-local, query-level, global.
//! Global parameters are an explicit value handed to whatever needs them,
//! typically loaded once from a JSON file at startup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Long(v) => write!(f, "{v}"),
            ParamValue::Double(v) => write!(f, "{v}"),
            ParamValue::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Long(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Double(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

/// A flat, typed parameter map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    pub fn new() -> Self {
        Parameters::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.0.get(name)? {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            ParamValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Longs widen to doubles.
    pub fn get_double(&self, name: &str) -> Option<f64> {
        match self.0.get(name)? {
            ParamValue::Double(v) => Some(*v),
            ParamValue::Long(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name)? {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Name of the parameter carrying a node's primary argument (the term).
pub const DEFAULT_PARAMETER: &str = "default";

/// One node of a query tree: an operator, its parameters and children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub operator: String,
    pub parameters: Parameters,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(operator: &str) -> Self {
        Node {
            operator: operator.to_string(),
            parameters: Parameters::new(),
            children: Vec::new(),
        }
    }

    /// Node whose `default` parameter is `term`, e.g. `#extents:cat()`.
    pub fn with_default(operator: &str, term: &str) -> Self {
        Node::new(operator).with(DEFAULT_PARAMETER, term)
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.parameters.set(name, value);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn default_parameter(&self) -> Option<&str> {
        self.parameters.get_string(DEFAULT_PARAMETER)
    }

    pub fn require_string(&self, name: &str) -> Result<&str> {
        match self.parameters.get(name) {
            Some(ParamValue::String(v)) => Ok(v),
            Some(_) => Err(self.invalid(name, "a string")),
            None => Err(self.missing(name)),
        }
    }

    pub fn require_long(&self, name: &str) -> Result<i64> {
        match self.parameters.get(name) {
            Some(ParamValue::Long(v)) => Ok(*v),
            Some(_) => Err(self.invalid(name, "an integer")),
            None => Err(self.missing(name)),
        }
    }

    pub fn require_double(&self, name: &str) -> Result<f64> {
        match self.parameters.get(name) {
            Some(_) => self
                .parameters
                .get_double(name)
                .ok_or_else(|| self.invalid(name, "a number")),
            None => Err(self.missing(name)),
        }
    }

    fn missing(&self, name: &str) -> Error {
        Error::MissingParameter {
            parameter: name.to_string(),
            node: self.to_string(),
        }
    }

    fn invalid(&self, name: &str, expected: &'static str) -> Error {
        Error::InvalidParameter {
            parameter: name.to_string(),
            node: self.to_string(),
            expected,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.operator)?;
        for (name, value) in self.parameters.iter() {
            write!(f, ":{name}={value}")?;
        }
        write!(f, "(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{child}")?;
        }
        write!(f, ")")
    }
}

/// Fills required parameters a node does not set itself from the query
/// layer, then the global layer.
#[derive(Debug, Clone, Default)]
pub struct ParameterResolver {
    query: Parameters,
    global: Parameters,
}

impl ParameterResolver {
    pub fn new(query: Parameters, global: Parameters) -> Self {
        ParameterResolver { query, global }
    }

    /// Resolve a single parameter across the query and global layers.
    pub fn lookup(&self, name: &str) -> Option<&ParamValue> {
        self.query.get(name).or_else(|| self.global.get(name))
    }

    /// Annotate `node` with every name in `required`. Fails on the first
    /// parameter that no layer provides.
    pub fn annotate(&self, node: &mut Node, required: &[&str]) -> Result<()> {
        for &name in required {
            if node.parameters.contains(name) {
                continue;
            }
            let value = self.lookup(name).cloned().ok_or_else(|| Error::MissingParameter {
                parameter: name.to_string(),
                node: node.to_string(),
            })?;
            node.parameters.set(name, value);
        }
        Ok(())
    }

    /// Annotate a whole tree, children first. `required` maps an operator to
    /// the parameters its iterator needs.
    pub fn annotate_tree<F>(&self, node: &mut Node, required: &F) -> Result<()>
    where
        F: Fn(&str) -> &'static [&'static str],
    {
        for child in &mut node.children {
            self.annotate_tree(child, required)?;
        }
        let names = required(&node.operator);
        self.annotate(node, names)
    }
}
