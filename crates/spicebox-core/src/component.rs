//! Component and model definitions held by a circuit session.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// Returns true for the node names SPICE treats as ground.
pub fn is_ground(node: &str) -> bool {
    node == "0" || node.eq_ignore_ascii_case("gnd")
}

/// Kind of circuit element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Resistor,
    Capacitor,
    Inductor,
    VoltageSource,
    CurrentSource,
    Diode,
    Bjt,
    Mosfet,
    Jfet,
    Subcircuit,
}

impl ComponentKind {
    /// Parse a component type token.
    ///
    /// Accepts descriptive names (`resistor`, `voltage_source`) as well as SPICE
    /// element letters (`R`, `V`), case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let kind = match token.as_str() {
            "r" | "res" | "resistor" => ComponentKind::Resistor,
            "c" | "cap" | "capacitor" => ComponentKind::Capacitor,
            "l" | "ind" | "inductor" => ComponentKind::Inductor,
            "v" | "vsource" | "voltage" | "voltage_source" => ComponentKind::VoltageSource,
            "i" | "isource" | "current" | "current_source" => ComponentKind::CurrentSource,
            "d" | "diode" => ComponentKind::Diode,
            "q" | "bjt" | "npn" | "pnp" => ComponentKind::Bjt,
            "m" | "mos" | "mosfet" | "nmos" | "pmos" => ComponentKind::Mosfet,
            "j" | "jfet" | "njf" | "pjf" => ComponentKind::Jfet,
            "x" | "subckt" | "subcircuit" => ComponentKind::Subcircuit,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Resistor => "resistor",
            ComponentKind::Capacitor => "capacitor",
            ComponentKind::Inductor => "inductor",
            ComponentKind::VoltageSource => "voltage_source",
            ComponentKind::CurrentSource => "current_source",
            ComponentKind::Diode => "diode",
            ComponentKind::Bjt => "bjt",
            ComponentKind::Mosfet => "mosfet",
            ComponentKind::Jfet => "jfet",
            ComponentKind::Subcircuit => "subcircuit",
        }
    }

    /// Allowed number of terminals as an inclusive range.
    pub fn terminal_count(&self) -> (usize, usize) {
        match self {
            ComponentKind::Resistor
            | ComponentKind::Capacitor
            | ComponentKind::Inductor
            | ComponentKind::VoltageSource
            | ComponentKind::CurrentSource
            | ComponentKind::Diode => (2, 2),
            ComponentKind::Bjt | ComponentKind::Mosfet => (3, 4),
            ComponentKind::Jfet => (3, 3),
            ComponentKind::Subcircuit => (1, usize::MAX),
        }
    }

    /// Passive elements need a numeric value.
    pub fn requires_value(&self) -> bool {
        matches!(
            self,
            ComponentKind::Resistor | ComponentKind::Capacitor | ComponentKind::Inductor
        )
    }

    /// Semiconductor devices and subcircuit instances refer to a model or definition.
    pub fn requires_model(&self) -> bool {
        matches!(
            self,
            ComponentKind::Diode
                | ComponentKind::Bjt
                | ComponentKind::Mosfet
                | ComponentKind::Jfet
                | ComponentKind::Subcircuit
        )
    }

    /// Independent voltage or current source.
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            ComponentKind::VoltageSource | ComponentKind::CurrentSource
        )
    }

    /// Elements that carry a branch current variable in MNA.
    pub fn has_branch_current(&self) -> bool {
        matches!(
            self,
            ComponentKind::VoltageSource | ComponentKind::Inductor
        )
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A circuit element as described by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    /// Instance name (e.g. "R1").
    pub name: String,
    /// Element kind.
    pub kind: ComponentKind,
    /// Terminal node names, in SPICE order.
    pub nodes: Vec<String>,
    /// Primary value (ohms, farads, henries, volts, amps).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Model or subcircuit name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Additional instance parameters (keys stored lowercase).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, f64>,
}

impl Component {
    /// Create a component with no value, model or parameters.
    pub fn new(name: impl Into<String>, kind: ComponentKind, nodes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            nodes,
            value: None,
            model: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Set the primary value.
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set an instance parameter.
    pub fn with_parameter(mut self, name: &str, value: f64) -> Self {
        self.parameters.insert(name.to_ascii_lowercase(), value);
        self
    }

    /// Look up an instance parameter case-insensitively.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(&name.to_ascii_lowercase()).copied()
    }

    /// Check that the definition is self-consistent.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidComponent(
                "component_name must not be empty".to_string(),
            ));
        }

        let (min, max) = self.kind.terminal_count();
        let count = self.nodes.len();
        if count < min || count > max {
            let expected = if min == max {
                format!("{}", min)
            } else if max == usize::MAX {
                format!("at least {}", min)
            } else {
                format!("{} or {}", min, max)
            };
            return Err(Error::InvalidComponent(format!(
                "{} '{}' needs {} nodes, got {}",
                self.kind, self.name, expected, count
            )));
        }
        if let Some(node) = self.nodes.iter().find(|n| n.trim().is_empty()) {
            return Err(Error::InvalidComponent(format!(
                "{} '{}' has an empty node name '{}'",
                self.kind, self.name, node
            )));
        }

        if self.kind.requires_value() {
            match self.value {
                None => {
                    return Err(Error::InvalidComponent(format!(
                        "value is required for {} '{}'",
                        self.kind, self.name
                    )));
                }
                Some(v) if !(v.is_finite() && v > 0.0) => {
                    return Err(Error::InvalidComponent(format!(
                        "{} '{}' value must be positive, got {}",
                        self.kind, self.name, v
                    )));
                }
                Some(_) => {}
            }
        }
        if let Some(v) = self.value
            && !v.is_finite()
        {
            return Err(Error::InvalidComponent(format!(
                "{} '{}' value must be finite",
                self.kind, self.name
            )));
        }

        if self.kind.requires_model() && self.model.as_deref().is_none_or(|m| m.trim().is_empty()) {
            return Err(Error::InvalidComponent(format!(
                "model is required for {} '{}'",
                self.kind, self.name
            )));
        }

        Ok(())
    }
}

/// A `.MODEL` card attached to a circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCard {
    /// Model name referenced by components.
    pub name: String,
    /// Device type token (e.g. "D", "NPN", "NMOS").
    pub device_type: String,
    /// Model parameters (keys stored uppercase).
    pub parameters: BTreeMap<String, f64>,
}

impl ModelCard {
    pub fn new(name: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device_type: device_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: &str, value: f64) -> Self {
        self.parameters.insert(name.to_ascii_uppercase(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_kind_tokens() {
        assert_eq!(ComponentKind::parse("R"), Some(ComponentKind::Resistor));
        assert_eq!(ComponentKind::parse("resistor"), Some(ComponentKind::Resistor));
        assert_eq!(
            ComponentKind::parse("Voltage Source"),
            Some(ComponentKind::VoltageSource)
        );
        assert_eq!(ComponentKind::parse("npn"), Some(ComponentKind::Bjt));
        assert_eq!(ComponentKind::parse("X"), Some(ComponentKind::Subcircuit));
        assert_eq!(ComponentKind::parse("memristor"), None);
    }

    #[test]
    fn test_ground_aliases() {
        assert!(is_ground("0"));
        assert!(is_ground("GND"));
        assert!(is_ground("gnd"));
        assert!(!is_ground("out"));
    }

    #[test]
    fn test_resistor_requires_value() {
        let r = Component::new("R1", ComponentKind::Resistor, nodes(&["in", "out"]));
        let err = r.validate().unwrap_err();
        assert!(err.to_string().contains("value is required"));

        let r = r.with_value(-1.0);
        assert!(r.validate().unwrap_err().to_string().contains("positive"));
    }

    #[test]
    fn test_terminal_count() {
        let q = Component::new("Q1", ComponentKind::Bjt, nodes(&["c", "b"])).with_model("Q2N3904");
        let err = q.validate().unwrap_err().to_string();
        assert!(err.contains("3 or 4"), "{}", err);

        let q = Component::new("Q1", ComponentKind::Bjt, nodes(&["c", "b", "e"]))
            .with_model("Q2N3904");
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_diode_requires_model() {
        let d = Component::new("D1", ComponentKind::Diode, nodes(&["a", "k"]));
        assert!(d.validate().unwrap_err().to_string().contains("model is required"));
    }

    #[test]
    fn test_parameters_case_insensitive() {
        let v = Component::new("V1", ComponentKind::VoltageSource, nodes(&["in", "0"]))
            .with_value(1.0)
            .with_parameter("AC", 1.0);
        assert_eq!(v.parameter("ac"), Some(1.0));
        assert_eq!(v.parameter("Ac"), Some(1.0));
    }
}
