//! Analyses run by the linear engine.

use std::f64::consts::PI;

use nalgebra::DVector;
use num_complex::Complex64;
use spicebox_core::{AcSweep, AnalysisKind, CachedAnalysisResult, SimulationOptions};
use tracing::debug;

use crate::error::{Error, Result};
use crate::netlist::Netlist;
use crate::stamp::{ac_system, dc_system, transient_system};

/// Relative tolerance when deciding whether a sweep endpoint was reached.
const SWEEP_EPS: f64 = 1e-9;

/// DC operating point. Each signal holds one sample; values are also stored as scalars.
pub fn operating_point(netlist: &Netlist, options: &SimulationOptions) -> Result<CachedAnalysisResult> {
    let solution = dc_system(netlist, options.gmin).solve("op")?;

    let mut builder = CachedAnalysisResult::builder(AnalysisKind::OperatingPoint, "point", vec![0.0]);
    for (name, value) in netlist.signal_names().into_iter().zip(solution.iter()) {
        builder = builder.real_signal(name.clone(), vec![*value]).scalar(name, *value);
    }
    Ok(builder.build()?)
}

/// Sweep the DC value of `source` from `start` to `stop` in steps of `step`.
pub fn dc_sweep(
    netlist: &Netlist,
    options: &SimulationOptions,
    source: &str,
    start: f64,
    stop: f64,
    step: f64,
) -> Result<CachedAnalysisResult> {
    if !(step.is_finite() && step > 0.0) {
        return Err(Error::InvalidAnalysis(format!("dc step must be positive, got {}", step)));
    }
    if !(start.is_finite() && stop.is_finite()) || start > stop {
        return Err(Error::InvalidAnalysis(format!(
            "dc start ({}) must not exceed stop ({})",
            start, stop
        )));
    }
    if !netlist.has_source(source) {
        return Err(Error::SourceNotFound(source.to_string()));
    }

    let count = ((stop - start) / step * (1.0 + SWEEP_EPS)).floor() as usize + 1;
    let values: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
    debug!(source, points = count, "dc sweep");

    let names = netlist.signal_names();
    let mut series = vec![Vec::with_capacity(count); names.len()];
    let mut swept = netlist.clone();
    for &value in &values {
        swept.set_source_dc(source, value)?;
        let solution = dc_system(&swept, options.gmin).solve("dc")?;
        for (column, x) in series.iter_mut().zip(solution.iter()) {
            column.push(*x);
        }
    }

    let mut builder = CachedAnalysisResult::builder(AnalysisKind::Dc, source, values);
    for (name, column) in names.into_iter().zip(series) {
        builder = builder.real_signal(name, column);
    }
    Ok(builder.build()?)
}

/// Small-signal AC sweep.
pub fn ac_sweep(netlist: &Netlist, options: &SimulationOptions, sweep: &AcSweep) -> Result<CachedAnalysisResult> {
    sweep.validate()?;
    let frequencies = sweep.frequencies();
    debug!(points = frequencies.len(), sweep = %sweep.sweep_type, "ac sweep");

    let names = netlist.signal_names();
    let mut series: Vec<Vec<Complex64>> = vec![Vec::with_capacity(frequencies.len()); names.len()];
    for &f in &frequencies {
        let solution = ac_system(netlist, 2.0 * PI * f, options.gmin).solve("ac")?;
        for (column, x) in series.iter_mut().zip(solution.iter()) {
            column.push(*x);
        }
    }

    let mut builder = CachedAnalysisResult::builder(AnalysisKind::Ac, "frequency", frequencies);
    for (name, column) in names.into_iter().zip(series) {
        builder = builder.complex_samples(name, &column);
    }
    Ok(builder.build()?)
}

/// Transient analysis by backward Euler with a fixed step, starting from the
/// operating point. Samples before `start` are computed but not reported.
pub fn transient(
    netlist: &Netlist,
    options: &SimulationOptions,
    step: f64,
    stop: f64,
    start: f64,
) -> Result<CachedAnalysisResult> {
    if !(step.is_finite() && step > 0.0) {
        return Err(Error::InvalidAnalysis(format!("transient step must be positive, got {}", step)));
    }
    if !(stop.is_finite() && stop > 0.0) {
        return Err(Error::InvalidAnalysis(format!("transient stop must be positive, got {}", stop)));
    }
    if !(start.is_finite() && start >= 0.0 && start < stop) {
        return Err(Error::InvalidAnalysis(format!(
            "transient start ({}) must be in [0, stop)",
            start
        )));
    }

    let steps = (stop / step * (1.0 - SWEEP_EPS)).ceil() as usize;
    debug!(steps, step, stop, "transient");

    let names = netlist.signal_names();
    let mut times = Vec::new();
    let mut series = vec![Vec::new(); names.len()];
    let mut record = |t: f64, x: &DVector<f64>| {
        if t >= start * (1.0 - SWEEP_EPS) {
            times.push(t);
            for (column, v) in series.iter_mut().zip(x.iter()) {
                column.push(*v);
            }
        }
    };

    let mut previous = dc_system(netlist, options.gmin).solve("transient")?;
    record(0.0, &previous);

    let mut t_prev = 0.0;
    for k in 1..=steps {
        let t = (k as f64 * step).min(stop);
        let h = t - t_prev;
        let solution = transient_system(netlist, t, h, &previous, options.gmin).solve("transient")?;
        record(t, &solution);
        previous = solution;
        t_prev = t;
    }

    let mut builder = CachedAnalysisResult::builder(AnalysisKind::Transient, "time", times);
    for (name, column) in names.into_iter().zip(series) {
        builder = builder.real_signal(name, column);
    }
    Ok(builder.build()?)
}
