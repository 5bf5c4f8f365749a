//! Catalog entries.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::device::DeviceType;

/// A `.MODEL` definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntry {
    pub name: String,
    pub device_type: DeviceType,
    /// Numeric parameters, keys uppercase.
    pub parameters: BTreeMap<String, f64>,
    pub file: PathBuf,
    pub line: usize,
    /// Enclosing subcircuit, for models defined inside a `.SUBCKT` body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcircuit: Option<String>,
}

/// A `.SUBCKT` definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcircuitEntry {
    pub name: String,
    /// External nodes in declaration order.
    pub nodes: Vec<String>,
    pub file: PathBuf,
    pub line: usize,
    /// `PARAMS:` defaults that have numeric values.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, f64>,
}

impl SubcircuitEntry {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Everything read from one library file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLibrary {
    pub models: Vec<ModelEntry>,
    pub subcircuits: Vec<SubcircuitEntry>,
    pub warnings: Vec<String>,
}
