//! Tool handlers, grouped by concern.
//!
//! Each submodule exposes `specs()`; [`all`] concatenates them into the order
//! `tools/list` reports.

mod analysis;
mod circuit;
mod library;
mod plotting;
mod signal;
mod sweeps;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::args::ToolArgs;
use crate::dispatcher::ToolSpec;

pub(crate) fn all() -> Vec<ToolSpec> {
    let mut specs = circuit::specs();
    specs.extend(analysis::specs());
    specs.extend(sweeps::specs());
    specs.extend(plotting::specs());
    specs.extend(signal::specs());
    specs.extend(library::specs());
    specs
}

/// Arguments of tools that only need a target circuit.
#[derive(Deserialize)]
struct CircuitArgs {
    #[serde(default)]
    circuit_id: Option<String>,
}

impl ToolArgs for CircuitArgs {}

/// Builds the JSON schema of an argument object.
struct Schema {
    properties: Map<String, Value>,
    required: Vec<&'static str>,
}

impl Schema {
    fn new() -> Self {
        Self {
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Optional `circuit_id`, falling back to the active circuit.
    fn circuit_id(self) -> Self {
        self.optional(
            "circuit_id",
            json!({"type": "string", "description": "Circuit id; defaults to the active circuit"}),
        )
    }

    fn required(mut self, name: &'static str, schema: Value) -> Self {
        self.properties.insert(name.to_string(), schema);
        self.required.push(name);
        self
    }

    fn optional(mut self, name: &'static str, schema: Value) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

fn string(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

/// A number, or a string with a SPICE suffix such as `"4.7k"`.
fn numeric(description: &str) -> Value {
    json!({"type": ["number", "string"], "description": description})
}

fn number(description: &str) -> Value {
    json!({"type": "number", "description": description})
}

fn integer(description: &str) -> Value {
    json!({"type": "integer", "minimum": 0, "description": description})
}

fn string_list(description: &str) -> Value {
    json!({"type": "array", "items": {"type": "string"}, "description": description})
}

fn boolean(description: &str) -> Value {
    json!({"type": "boolean", "description": description})
}

fn image_format() -> Value {
    json!({"type": "string", "enum": ["png", "svg"], "description": "Image format"})
}

/// Finite values only; `null` stands in for anything else.
fn finite_or_null(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|v| v.is_finite().then_some(*v)).collect()
}

/// (min, max, mean) over the finite entries.
fn stats(values: &[f64]) -> Option<(f64, f64, f64)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    Some((min, max, mean))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_marks_required() {
        let schema = Schema::new()
            .circuit_id()
            .required("signal", string("Signal"))
            .build();
        assert_eq!(schema["required"], json!(["signal"]));
        assert_eq!(schema["properties"]["circuit_id"]["type"], "string");
    }

    #[test]
    fn test_tool_names_are_unique() {
        let specs = all();
        let mut names: Vec<_> = specs.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), specs.len());
        assert!(!names.contains(&"run_noise_analysis"));
    }

    #[test]
    fn test_stats_skip_non_finite() {
        let (min, max, mean) = stats(&[1.0, f64::INFINITY, 3.0]).unwrap();
        assert_eq!((min, max, mean), (1.0, 3.0, 2.0));
        assert!(stats(&[f64::NAN]).is_none());
        assert_eq!(finite_or_null(&[1.0, f64::NAN]), vec![Some(1.0), None]);
    }
}
