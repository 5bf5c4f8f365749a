//! Resolution of a circuit session into stampable elements.

use indexmap::IndexMap;
use num_complex::Complex64;
use spicebox_core::{
    Circuit, Component, ComponentKind, SimulationOptions, current_signal, is_ground,
    voltage_signal,
};

use crate::error::{Error, Result};
use crate::waveform::Waveform;

/// Nominal temperature for resistor temperature coefficients, °C.
const DEFAULT_TNOM: f64 = 27.0;

/// Independent source excitation.
#[derive(Debug, Clone)]
pub struct Excitation {
    /// Value used by the operating point and DC sweep.
    pub dc: f64,
    /// Small-signal phasor.
    pub ac: Complex64,
    /// Transient waveform.
    pub waveform: Waveform,
}

impl Excitation {
    fn from_component(component: &Component) -> Self {
        let waveform = Waveform::from_component(component);
        let magnitude = component.parameter("ac").unwrap_or(0.0);
        let phase = component.parameter("ac_phase").unwrap_or(0.0).to_radians();
        Self {
            dc: waveform.dc_value(),
            ac: Complex64::from_polar(magnitude, phase),
            waveform,
        }
    }
}

/// An element with node names resolved to matrix indices (`None` is ground).
#[derive(Debug, Clone)]
pub enum Element {
    Resistor {
        a: Option<usize>,
        b: Option<usize>,
        conductance: f64,
    },
    Capacitor {
        a: Option<usize>,
        b: Option<usize>,
        capacitance: f64,
    },
    Inductor {
        a: Option<usize>,
        b: Option<usize>,
        branch: usize,
        inductance: f64,
    },
    VoltageSource {
        name: String,
        a: Option<usize>,
        b: Option<usize>,
        branch: usize,
        excitation: Excitation,
    },
    CurrentSource {
        name: String,
        a: Option<usize>,
        b: Option<usize>,
        excitation: Excitation,
    },
}

/// Circuit resolved for the linear engine.
#[derive(Debug, Clone)]
pub struct Netlist {
    nodes: IndexMap<String, usize>,
    branches: IndexMap<String, usize>,
    pub elements: Vec<Element>,
}

impl Netlist {
    /// Resolve a circuit. Non-linear devices are rejected.
    pub fn from_circuit(circuit: &Circuit, options: &SimulationOptions) -> Result<Self> {
        if circuit.components().is_empty() {
            return Err(Error::EmptyCircuit);
        }

        let mut nodes = IndexMap::new();
        for name in circuit.node_names() {
            let index = nodes.len();
            nodes.insert(name, index);
        }

        let mut branches = IndexMap::new();
        let mut elements = Vec::with_capacity(circuit.components().len());

        for component in circuit.components() {
            let node = |i: usize| -> Option<usize> {
                let name = component.nodes.get(i)?;
                if is_ground(name) {
                    None
                } else {
                    nodes.get(name).copied()
                }
            };
            let (a, b) = (node(0), node(1));

            let element = match component.kind {
                ComponentKind::Resistor => Element::Resistor {
                    a,
                    b,
                    conductance: 1.0 / resistance_at(component, options.temperature)?,
                },
                ComponentKind::Capacitor => Element::Capacitor {
                    a,
                    b,
                    capacitance: positive_value(component)?,
                },
                ComponentKind::Inductor => {
                    let branch = branches.len();
                    branches.insert(component.name.clone(), branch);
                    Element::Inductor {
                        a,
                        b,
                        branch,
                        inductance: positive_value(component)?,
                    }
                }
                ComponentKind::VoltageSource => {
                    let branch = branches.len();
                    branches.insert(component.name.clone(), branch);
                    Element::VoltageSource {
                        name: component.name.clone(),
                        a,
                        b,
                        branch,
                        excitation: Excitation::from_component(component),
                    }
                }
                ComponentKind::CurrentSource => Element::CurrentSource {
                    name: component.name.clone(),
                    a,
                    b,
                    excitation: Excitation::from_component(component),
                },
                other => {
                    return Err(Error::Unsupported {
                        component: component.name.clone(),
                        kind: other.to_string(),
                    });
                }
            };
            elements.push(element);
        }

        Ok(Self {
            nodes,
            branches,
            elements,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    /// Signal names in solution-vector order.
    pub fn signal_names(&self) -> Vec<String> {
        self.nodes
            .keys()
            .map(|n| voltage_signal(n))
            .chain(self.branches.keys().map(|b| current_signal(b)))
            .collect()
    }

    /// Override the DC value of an independent source (DC sweep).
    pub fn set_source_dc(&mut self, source: &str, value: f64) -> Result<()> {
        for element in &mut self.elements {
            match element {
                Element::VoltageSource {
                    name, excitation, ..
                }
                | Element::CurrentSource {
                    name, excitation, ..
                } if name.eq_ignore_ascii_case(source) => {
                    excitation.dc = value;
                    excitation.waveform = Waveform::Dc(value);
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(Error::SourceNotFound(source.to_string()))
    }

    /// Whether an independent source with this name exists.
    pub fn has_source(&self, source: &str) -> bool {
        self.elements.iter().any(|e| match e {
            Element::VoltageSource { name, .. } | Element::CurrentSource { name, .. } => {
                name.eq_ignore_ascii_case(source)
            }
            _ => false,
        })
    }
}

fn positive_value(component: &Component) -> Result<f64> {
    match component.value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(Error::InvalidAnalysis(format!(
            "{} '{}' needs a positive value",
            component.kind, component.name
        ))),
    }
}

/// Resistance at `temperature` using the instance `tc1`, `tc2` and `tnom` parameters.
fn resistance_at(component: &Component, temperature: f64) -> Result<f64> {
    let nominal = positive_value(component)?;
    let tc1 = component.parameter("tc1").unwrap_or(0.0);
    let tc2 = component.parameter("tc2").unwrap_or(0.0);
    let dt = temperature - component.parameter("tnom").unwrap_or(DEFAULT_TNOM);
    let r = nominal * (1.0 + tc1 * dt + tc2 * dt * dt);
    if r > 0.0 && r.is_finite() {
        Ok(r)
    } else {
        Err(Error::InvalidAnalysis(format!(
            "resistor '{}' has non-positive resistance {} at {} °C",
            component.name, r, temperature
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(a: &str, b: &str) -> Vec<String> {
        vec![a.to_string(), b.to_string()]
    }

    #[test]
    fn test_indices_and_signals() {
        let mut c = Circuit::new("t", "");
        c.add_component(
            Component::new("V1", ComponentKind::VoltageSource, nodes("in", "0")).with_value(1.0),
        )
        .unwrap();
        c.add_component(Component::new("L1", ComponentKind::Inductor, nodes("in", "out")).with_value(1e-3))
            .unwrap();
        c.add_component(Component::new("R1", ComponentKind::Resistor, nodes("out", "gnd")).with_value(50.0))
            .unwrap();

        let n = Netlist::from_circuit(&c, &SimulationOptions::default()).unwrap();
        assert_eq!(n.num_nodes(), 2);
        assert_eq!(n.num_branches(), 2);
        assert_eq!(n.signal_names(), vec!["v(in)", "v(out)", "i(V1)", "i(L1)"]);
    }

    #[test]
    fn test_rejects_nonlinear_devices() {
        let mut c = Circuit::new("t", "");
        c.add_component(
            Component::new("D1", ComponentKind::Diode, nodes("a", "0")).with_model("D1N4148"),
        )
        .unwrap();
        let err = Netlist::from_circuit(&c, &SimulationOptions::default()).unwrap_err();
        assert!(err.to_string().contains("not supported by the linear engine"));
    }

    #[test]
    fn test_resistor_temperature_coefficient() {
        let r = Component::new("R1", ComponentKind::Resistor, nodes("a", "0"))
            .with_value(1000.0)
            .with_parameter("tc1", 0.01);
        assert!((resistance_at(&r, 27.0).unwrap() - 1000.0).abs() < 1e-9);
        assert!((resistance_at(&r, 127.0).unwrap() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_source_dc() {
        let mut c = Circuit::new("t", "");
        c.add_component(
            Component::new("V1", ComponentKind::VoltageSource, nodes("in", "0")).with_value(1.0),
        )
        .unwrap();
        let mut n = Netlist::from_circuit(&c, &SimulationOptions::default()).unwrap();
        n.set_source_dc("v1", 2.0).unwrap();
        assert!(n.set_source_dc("V9", 2.0).is_err());
        assert!(n.has_source("V1"));
    }
}
