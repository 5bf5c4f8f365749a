//! Stamping of resolved elements into MNA systems.

use nalgebra::DVector;
use num_complex::Complex64;

use crate::mna::MnaSystem;
use crate::netlist::{Element, Netlist};

/// Real system for the DC operating point: capacitors open, inductors shorted.
pub fn dc_system(netlist: &Netlist, gmin: f64) -> MnaSystem<f64> {
    let mut mna = MnaSystem::new(netlist.num_nodes(), netlist.num_branches());
    for element in &netlist.elements {
        match element {
            Element::Resistor { a, b, conductance } => mna.stamp_conductance(*a, *b, *conductance),
            Element::Capacitor { .. } => {}
            Element::Inductor { a, b, branch, .. } => mna.stamp_branch(*a, *b, *branch, 0.0, 0.0),
            Element::VoltageSource {
                a,
                b,
                branch,
                excitation,
                ..
            } => mna.stamp_branch(*a, *b, *branch, 0.0, excitation.dc),
            Element::CurrentSource { a, b, excitation, .. } => {
                mna.stamp_current_source(*a, *b, excitation.dc)
            }
        }
    }
    mna.stamp_gmin(gmin);
    mna
}

/// Complex small-signal system at angular frequency `omega`.
pub fn ac_system(netlist: &Netlist, omega: f64, gmin: f64) -> MnaSystem<Complex64> {
    let mut mna = MnaSystem::new(netlist.num_nodes(), netlist.num_branches());
    let zero = Complex64::new(0.0, 0.0);
    for element in &netlist.elements {
        match element {
            Element::Resistor { a, b, conductance } => mna.stamp_conductance(*a, *b, *conductance),
            Element::Capacitor { a, b, capacitance } => {
                mna.stamp_admittance(*a, *b, Complex64::new(0.0, omega * capacitance))
            }
            Element::Inductor {
                a,
                b,
                branch,
                inductance,
            } => mna.stamp_branch(*a, *b, *branch, Complex64::new(0.0, omega * inductance), zero),
            Element::VoltageSource {
                a,
                b,
                branch,
                excitation,
                ..
            } => mna.stamp_branch(*a, *b, *branch, zero, excitation.ac),
            Element::CurrentSource { a, b, excitation, .. } => {
                mna.stamp_current_source(*a, *b, excitation.ac)
            }
        }
    }
    mna.stamp_gmin(gmin);
    mna
}

/// Real system for one backward-Euler step of size `h` ending at `time`.
///
/// `previous` is the solution at the prior time point.
pub fn transient_system(
    netlist: &Netlist,
    time: f64,
    h: f64,
    previous: &DVector<f64>,
    gmin: f64,
) -> MnaSystem<f64> {
    let mut mna = MnaSystem::new(netlist.num_nodes(), netlist.num_branches());
    let voltage = |node: Option<usize>| node.map_or(0.0, |i| previous[i]);
    let num_nodes = netlist.num_nodes();

    for element in &netlist.elements {
        match element {
            Element::Resistor { a, b, conductance } => mna.stamp_conductance(*a, *b, *conductance),
            Element::Capacitor { a, b, capacitance } => {
                // C is replaced by G_eq = C/h in parallel with I_eq = G_eq * V_prev.
                let geq = capacitance / h;
                let ieq = geq * (voltage(*a) - voltage(*b));
                mna.stamp_conductance(*a, *b, geq);
                mna.stamp_current_source(*b, *a, ieq);
            }
            Element::Inductor {
                a,
                b,
                branch,
                inductance,
            } => {
                // V = L/h (I - I_prev)
                let req = inductance / h;
                let i_prev = previous[num_nodes + branch];
                mna.stamp_branch(*a, *b, *branch, req, -req * i_prev);
            }
            Element::VoltageSource {
                a,
                b,
                branch,
                excitation,
                ..
            } => mna.stamp_branch(*a, *b, *branch, 0.0, excitation.waveform.value_at(time)),
            Element::CurrentSource { a, b, excitation, .. } => {
                mna.stamp_current_source(*a, *b, excitation.waveform.value_at(time))
            }
        }
    }
    mna.stamp_gmin(gmin);
    mna
}
