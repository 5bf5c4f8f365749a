//! Port impedance by AC current injection.
//!
//! The circuit is copied, every independent source has its AC excitation
//! removed, and a 1 A AC probe is connected across the port. The port voltage
//! then equals the impedance.

use num_complex::Complex64;
use serde::Serialize;
use spicebox_core::{
    AcSweep, AnalysisKind, AnalysisRequest, CachedAnalysisResult, Circuit, Component,
    ComponentKind, SimulationEngine, SimulationOptions, is_ground, voltage_signal,
};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Name of the signal an impedance sweep is stored under.
pub fn impedance_signal(pos: &str, neg: &str) -> String {
    format!("z({},{})", pos, neg)
}

/// Magnitude above which a port is reported as open.
pub const OPEN_PORT_OHMS: f64 = 1e9;

/// Impedance seen between two nodes over a frequency sweep.
#[derive(Debug, Clone, Serialize)]
pub struct Impedance {
    pub port_positive: String,
    pub port_negative: String,
    pub frequencies: Vec<f64>,
    #[serde(skip)]
    pub z: Vec<Complex64>,
    pub magnitude: Vec<f64>,
    /// Phase in degrees.
    pub phase: Vec<f64>,
    /// True when the engine could not solve the probed circuit or the port
    /// looks open at every frequency.
    pub open: bool,
}

impl Impedance {
    /// Result to cache: one complex `z(pos,neg)` signal against frequency.
    pub fn to_result(&self) -> Result<CachedAnalysisResult> {
        Ok(
            CachedAnalysisResult::builder(AnalysisKind::Ac, "frequency", self.frequencies.clone())
                .complex_samples(impedance_signal(&self.port_positive, &self.port_negative), &self.z)
                .build()?,
        )
    }
}

/// Measure the impedance between `pos` and `neg`.
pub fn port_impedance(
    engine: &dyn SimulationEngine,
    circuit: &Circuit,
    options: &SimulationOptions,
    pos: &str,
    neg: &str,
    sweep: &AcSweep,
) -> Result<Impedance> {
    if pos == neg || (is_ground(pos) && is_ground(neg)) {
        return Err(Error::InvalidPort(format!(
            "port_positive and port_negative must differ (both '{}')",
            pos
        )));
    }
    sweep.validate()?;

    let known = circuit.node_names();
    for node in [pos, neg] {
        if !is_ground(node) && !known.iter().any(|n| n == node) {
            warn!(circuit = circuit.id(), node, "port node is not connected to anything");
        }
    }

    let probed = with_probe(circuit, pos, neg)?;

    let (frequencies, z) = match engine.run(&probed, &AnalysisRequest::Ac(*sweep), options) {
        Ok(result) => {
            let v_pos = node_voltage(&result, pos)?;
            let v_neg = node_voltage(&result, neg)?;
            let z = v_pos.iter().zip(&v_neg).map(|(a, b)| a - b).collect();
            (result.x_values().to_vec(), z)
        }
        Err(spicebox_core::Error::SingularMatrix(msg)) => {
            debug!(circuit = circuit.id(), %msg, "singular probe matrix, treating port as open");
            let frequencies = sweep.frequencies();
            let z = vec![Complex64::new(f64::INFINITY, 0.0); frequencies.len()];
            (frequencies, z)
        }
        Err(e) => return Err(e.into()),
    };

    let magnitude: Vec<f64> = z.iter().map(|c| c.norm()).collect();
    let phase = z
        .iter()
        .map(|c| if c.is_finite() { c.arg().to_degrees() } else { 0.0 })
        .collect();
    let open = magnitude.iter().all(|&m| !(m < OPEN_PORT_OHMS));

    Ok(Impedance {
        port_positive: pos.to_string(),
        port_negative: neg.to_string(),
        frequencies,
        z,
        magnitude,
        phase,
        open,
    })
}

/// Copy of `circuit` with source AC excitation removed and a 1 A AC probe
/// current flowing into `pos` and out of `neg`.
fn with_probe(circuit: &Circuit, pos: &str, neg: &str) -> Result<Circuit> {
    let mut probed = Circuit::new(circuit.id(), circuit.description());
    for component in circuit.components() {
        let mut component = component.clone();
        if component.kind.is_source() {
            component.parameters.remove("ac");
            component.parameters.remove("ac_phase");
        }
        probed.add_component(component)?;
    }

    let mut name = "IZPROBE".to_string();
    let mut suffix = 1;
    while probed.component(&name).is_some() {
        name = format!("IZPROBE{}", suffix);
        suffix += 1;
    }
    // Source current flows from its first node to its second.
    probed.add_component(
        Component::new(name, ComponentKind::CurrentSource, vec![neg.to_string(), pos.to_string()])
            .with_value(0.0)
            .with_parameter("ac", 1.0),
    )?;
    Ok(probed)
}

fn node_voltage(result: &CachedAnalysisResult, node: &str) -> Result<Vec<Complex64>> {
    if is_ground(node) {
        return Ok(vec![Complex64::new(0.0, 0.0); result.len()]);
    }
    Ok(result.complex(&voltage_signal(node))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_replaces_ac_excitation() {
        let mut c = Circuit::new("c", "");
        c.add_component(
            Component::new("V1", ComponentKind::VoltageSource, vec!["in".into(), "0".into()])
                .with_value(1.0)
                .with_parameter("ac", 1.0),
        )
        .unwrap();
        c.add_component(
            Component::new("IZPROBE", ComponentKind::Resistor, vec!["in".into(), "0".into()])
                .with_value(50.0),
        )
        .unwrap();

        let probed = with_probe(&c, "in", "0").unwrap();
        assert_eq!(probed.components().len(), 3);
        assert_eq!(probed.component("V1").unwrap().parameter("ac"), None);
        let probe = probed.component("IZPROBE1").unwrap();
        assert_eq!(probe.nodes, vec!["0", "in"]);
        assert_eq!(probe.parameter("ac"), Some(1.0));
    }

    #[test]
    fn test_signal_name() {
        assert_eq!(impedance_signal("in", "0"), "z(in,0)");
    }
}
