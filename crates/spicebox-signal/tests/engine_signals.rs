//! Derived signals computed on results produced by the linear engine.

use std::f64::consts::PI;

use spicebox_core::{
    AcSweep, AnalysisKind, AnalysisRequest, Circuit, Component, ComponentKind, SimulationEngine,
    SimulationOptions,
};
use spicebox_engine::LinearEngine;
use spicebox_signal::{Metric, OPEN_PORT_OHMS, group_delay, measure_response, port_impedance};

fn nodes(a: &str, b: &str) -> Vec<String> {
    vec![a.to_string(), b.to_string()]
}

/// V1 (1 V AC, pulse 0 -> 1 V after 1 ns) -> R1 1k -> out, C1 1u to ground.
fn rc_lowpass() -> Circuit {
    let mut c = Circuit::new("rc", "RC low-pass");
    c.add_component(
        Component::new("V1", ComponentKind::VoltageSource, nodes("in", "0"))
            .with_value(0.0)
            .with_parameter("ac", 1.0)
            .with_parameter("pulse_v1", 0.0)
            .with_parameter("pulse_v2", 1.0)
            .with_parameter("pulse_td", 1e-9),
    )
    .unwrap();
    c.add_component(Component::new("R1", ComponentKind::Resistor, nodes("in", "out")).with_value(1e3))
        .unwrap();
    c.add_component(Component::new("C1", ComponentKind::Capacitor, nodes("out", "0")).with_value(1e-6))
        .unwrap();
    c
}

fn options() -> SimulationOptions {
    SimulationOptions::default()
}

#[test]
fn group_delay_of_simulated_lowpass() {
    let engine = LinearEngine::new();
    let result = engine
        .run(&rc_lowpass(), &AnalysisRequest::Ac(AcSweep::decade(10.0, 1e4, 100)), &options())
        .unwrap();
    let gd = group_delay(&result, "v(out)").unwrap();

    let rc = 1e-3;
    let i = gd.frequencies.len() / 2;
    let w = 2.0 * PI * gd.frequencies[i];
    let expected = rc / (1.0 + (w * rc).powi(2));
    assert!((gd.delay[i] - expected).abs() < 0.01 * expected);
}

#[test]
fn impedance_of_resistor_is_flat() {
    let mut c = Circuit::new("r", "");
    c.add_component(Component::new("R1", ComponentKind::Resistor, nodes("a", "0")).with_value(470.0))
        .unwrap();

    let z = port_impedance(&LinearEngine::new(), &c, &options(), "a", "0", &AcSweep::decade(100.0, 1e5, 5))
        .unwrap();
    assert!(!z.open);
    for (&m, &p) in z.magnitude.iter().zip(&z.phase) {
        assert!((m - 470.0).abs() < 1e-3, "|Z| = {}", m);
        assert!(p.abs() < 1e-6);
    }
}

#[test]
fn impedance_of_rc_port_ignores_source_excitation() {
    // Looking into `out`: R1 to an AC-shorted source in parallel with C1.
    let c = rc_lowpass();
    let z = port_impedance(&LinearEngine::new(), &c, &options(), "out", "0", &AcSweep::decade(10.0, 1e5, 10))
        .unwrap();

    for (&f, &m) in z.frequencies.iter().zip(&z.magnitude) {
        let w = 2.0 * PI * f;
        let expected = 1e3 / (1.0 + (w * 1e-3).powi(2)).sqrt();
        assert!((m - expected).abs() < 1e-3 * expected, "f={} |Z|={} expected={}", f, m, expected);
    }
    // Capacitive: phase heads to -90 degrees.
    assert!(*z.phase.last().unwrap() < -80.0);

    let cached = z.to_result().unwrap();
    assert_eq!(cached.kind(), AnalysisKind::Ac);
    assert!(cached.has_complex("z(out,0)"));
}

#[test]
fn isolated_port_reports_huge_impedance() {
    let mut c = Circuit::new("open", "");
    c.add_component(Component::new("R1", ComponentKind::Resistor, nodes("a", "0")).with_value(1e3))
        .unwrap();
    c.add_component(Component::new("R2", ComponentKind::Resistor, nodes("b", "c")).with_value(1e3))
        .unwrap();

    let z = port_impedance(&LinearEngine::new(), &c, &options(), "b", "0", &AcSweep::decade(1e3, 1e4, 3))
        .unwrap();
    assert!(z.open);
    assert!(z.magnitude.iter().all(|&m| m >= OPEN_PORT_OHMS));
}

#[test]
fn identical_port_nodes_rejected() {
    let c = rc_lowpass();
    let err = port_impedance(&LinearEngine::new(), &c, &options(), "out", "out", &AcSweep::decade(10.0, 1e3, 5))
        .unwrap_err();
    assert!(err.to_string().contains("must differ"));
}

#[test]
fn step_response_of_simulated_lowpass() {
    let result = LinearEngine::new()
        .run(
            &rc_lowpass(),
            &AnalysisRequest::Transient {
                step: 1e-5,
                stop: 1e-2,
                start: 0.0,
            },
            &options(),
        )
        .unwrap();
    let report = measure_response(&result, "v(out)", &[]).unwrap();

    // Backward Euler with h = τ/100 stays within a few percent of τ·ln 9.
    let rise = report.value(Metric::RiseTime).unwrap();
    assert!((rise - 1e-3 * 9f64.ln()).abs() < 0.03 * 1e-3 * 9f64.ln(), "rise {}", rise);
    assert!(report.value(Metric::Overshoot).unwrap() < 0.1);
    assert!((report.value(Metric::FinalValue).unwrap() - 1.0).abs() < 1e-3);
}
