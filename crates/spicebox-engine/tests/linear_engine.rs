//! End-to-end analyses through the `SimulationEngine` interface.

use std::f64::consts::PI;

use spicebox_core::{
    AcSweep, AnalysisKind, AnalysisRequest, Circuit, Component, ComponentKind, SimulationEngine,
    SimulationOptions,
};
use spicebox_engine::LinearEngine;

fn nodes(a: &str, b: &str) -> Vec<String> {
    vec![a.to_string(), b.to_string()]
}

/// V1 (1 V DC, 1 V AC) -> R1 1k -> out, C1 1u to ground. RC = 1 ms.
fn rc_lowpass() -> Circuit {
    let mut c = Circuit::new("rc", "RC low-pass");
    c.add_component(
        Component::new("V1", ComponentKind::VoltageSource, nodes("in", "0"))
            .with_value(1.0)
            .with_parameter("ac", 1.0),
    )
    .unwrap();
    c.add_component(Component::new("R1", ComponentKind::Resistor, nodes("in", "out")).with_value(1e3))
        .unwrap();
    c.add_component(Component::new("C1", ComponentKind::Capacitor, nodes("out", "0")).with_value(1e-6))
        .unwrap();
    c
}

fn run(circuit: &Circuit, request: AnalysisRequest) -> spicebox_core::CachedAnalysisResult {
    LinearEngine::new()
        .run(circuit, &request, &SimulationOptions::default())
        .unwrap()
}

#[test]
fn operating_point_of_divider() {
    let mut c = Circuit::new("div", "");
    c.add_component(Component::new("V1", ComponentKind::VoltageSource, nodes("in", "0")).with_value(10.0))
        .unwrap();
    c.add_component(Component::new("R1", ComponentKind::Resistor, nodes("in", "mid")).with_value(1e3))
        .unwrap();
    c.add_component(Component::new("R2", ComponentKind::Resistor, nodes("mid", "0")).with_value(1e3))
        .unwrap();

    let r = run(&c, AnalysisRequest::OperatingPoint);
    assert_eq!(r.kind(), AnalysisKind::OperatingPoint);
    assert!((r.signal("v(mid)").unwrap()[0] - 5.0).abs() < 1e-6);
    // SPICE convention: current into the + terminal through the source.
    assert!((r.signal("i(V1)").unwrap()[0] + 5e-3).abs() < 1e-9);
    assert!(r.scalars().unwrap().contains_key("v(in)"));
}

#[test]
fn current_source_direction() {
    // I1 0 n 1mA drives current into n.
    let mut c = Circuit::new("isrc", "");
    c.add_component(Component::new("I1", ComponentKind::CurrentSource, nodes("0", "n")).with_value(1e-3))
        .unwrap();
    c.add_component(Component::new("R1", ComponentKind::Resistor, nodes("n", "0")).with_value(1e3))
        .unwrap();

    let r = run(&c, AnalysisRequest::OperatingPoint);
    assert!((r.signal("v(n)").unwrap()[0] - 1.0).abs() < 1e-6);
}

#[test]
fn dc_sweep_is_linear() {
    let c = rc_lowpass();
    let r = run(
        &c,
        AnalysisRequest::DcSweep {
            source: "V1".to_string(),
            start: 0.0,
            stop: 5.0,
            step: 0.5,
        },
    );
    assert_eq!(r.kind(), AnalysisKind::Dc);
    assert_eq!(r.len(), 11);
    let out = r.signal("v(out)").unwrap();
    for (x, y) in r.x_values().iter().zip(out) {
        assert!((x - y).abs() < 1e-6, "v(out) = {} at {}", y, x);
    }
}

#[test]
fn dc_sweep_unknown_source() {
    let c = rc_lowpass();
    let err = LinearEngine::new()
        .run(
            &c,
            &AnalysisRequest::DcSweep {
                source: "V9".to_string(),
                start: 0.0,
                stop: 1.0,
                step: 0.1,
            },
            &SimulationOptions::default(),
        )
        .unwrap_err();
    assert!(err.to_string().contains("V9"));
}

#[test]
fn ac_rc_corner() {
    let c = rc_lowpass();
    let fc = 1.0 / (2.0 * PI * 1e-3);
    let r = run(&c, AnalysisRequest::Ac(AcSweep::single(fc)));

    assert_eq!(r.kind(), AnalysisKind::Ac);
    let mag = r.magnitude("v(out)").unwrap();
    assert!((mag[0] - 1.0 / 2.0_f64.sqrt()).abs() < 1e-6);
    let phase = r.phase("v(out)").unwrap();
    assert!((phase[0] + PI / 4.0).abs() < 1e-6);
}

#[test]
fn ac_decade_sweep_rolls_off() {
    let c = rc_lowpass();
    let r = run(&c, AnalysisRequest::Ac(AcSweep::decade(10.0, 100e3, 10)));
    let mag = r.magnitude("v(out)").unwrap();
    assert_eq!(mag.len(), 41);
    assert!(mag.windows(2).all(|w| w[1] <= w[0]));
    assert!((mag[0] - 1.0).abs() < 5e-3);
    assert!(mag[40] < 0.002);
}

#[test]
fn transient_rc_step() {
    let mut c = rc_lowpass();
    c.remove_component("V1");
    c.add_component(
        Component::new("V1", ComponentKind::VoltageSource, nodes("in", "0"))
            .with_parameter("pulse_v1", 0.0)
            .with_parameter("pulse_v2", 1.0)
            .with_parameter("pulse_td", 1e-9),
    )
    .unwrap();

    let r = run(
        &c,
        AnalysisRequest::Transient {
            step: 1e-6,
            stop: 5e-3,
            start: 0.0,
        },
    );
    assert_eq!(r.kind(), AnalysisKind::Transient);
    assert_eq!(r.len(), 5001);

    let out = r.signal("v(out)").unwrap();
    // One time constant.
    let v_tau = out[1000];
    assert!((v_tau - (1.0 - (-1.0f64).exp())).abs() < 2e-3, "v(tau) = {}", v_tau);
    assert!((out[5000] - (1.0 - (-5.0f64).exp())).abs() < 2e-3);
}

#[test]
fn transient_start_trims_output() {
    let c = rc_lowpass();
    let r = run(
        &c,
        AnalysisRequest::Transient {
            step: 1e-4,
            stop: 1e-3,
            start: 5e-4,
        },
    );
    assert!(r.x_values()[0] >= 5e-4 * (1.0 - 1e-9));
    assert!((r.x_values().last().unwrap() - 1e-3).abs() < 1e-12);
}

#[test]
fn inductor_is_short_at_dc() {
    let mut c = Circuit::new("rl", "");
    c.add_component(Component::new("V1", ComponentKind::VoltageSource, nodes("in", "0")).with_value(1.0))
        .unwrap();
    c.add_component(Component::new("L1", ComponentKind::Inductor, nodes("in", "out")).with_value(1e-3))
        .unwrap();
    c.add_component(Component::new("R1", ComponentKind::Resistor, nodes("out", "0")).with_value(100.0))
        .unwrap();

    let r = run(&c, AnalysisRequest::OperatingPoint);
    assert!((r.signal("v(out)").unwrap()[0] - 1.0).abs() < 1e-6);
    assert!((r.signal("i(L1)").unwrap()[0] - 0.01).abs() < 1e-6);
}

#[test]
fn isolated_node_is_solvable() {
    let mut c = rc_lowpass();
    c.add_component(Component::new("C9", ComponentKind::Capacitor, nodes("island", "0")).with_value(1e-9))
        .unwrap();
    let r = run(&c, AnalysisRequest::OperatingPoint);
    assert!(r.signal("v(island)").unwrap()[0].abs() < 1e-9);
}

#[test]
fn temperature_scales_resistors() {
    let mut c = Circuit::new("tc", "");
    c.add_component(Component::new("I1", ComponentKind::CurrentSource, nodes("0", "n")).with_value(1e-3))
        .unwrap();
    c.add_component(
        Component::new("R1", ComponentKind::Resistor, nodes("n", "0"))
            .with_value(1e3)
            .with_parameter("tc1", 0.004),
    )
    .unwrap();

    let hot = LinearEngine::new()
        .run(
            &c,
            &AnalysisRequest::OperatingPoint,
            &SimulationOptions::default().with_temperature(77.0),
        )
        .unwrap();
    assert!((hot.signal("v(n)").unwrap()[0] - 1.2).abs() < 1e-6);
}

#[test]
fn nonlinear_device_is_an_engine_error() {
    let mut c = rc_lowpass();
    c.add_component(Component::new("D1", ComponentKind::Diode, nodes("out", "0")).with_model("D1N4148"))
        .unwrap();
    let err = LinearEngine::new()
        .run(&c, &AnalysisRequest::OperatingPoint, &SimulationOptions::default())
        .unwrap_err();
    assert!(matches!(err, spicebox_core::Error::Engine(_)));
    assert!(err.to_string().contains("D1"));
}
