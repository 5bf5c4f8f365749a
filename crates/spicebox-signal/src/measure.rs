//! Response measurements over cached results.
//!
//! Each metric is evaluated on its own: a metric that does not apply to the
//! data (wrong analysis kind, no threshold crossing, flat signal) yields an
//! entry with an `error` and no value, while the other metrics still report.

use std::fmt;

use serde::Serialize;
use spicebox_core::{AnalysisKind, CachedAnalysisResult};
use tracing::debug;

use crate::error::{Error, Result};
use crate::phase::{unwrap_phase, wrapped_phase};

/// Settling band as a fraction of the step size.
pub const SETTLING_BAND: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Max,
    Min,
    PeakToPeak,
    Average,
    Rms,
    FinalValue,
    /// 10 % to 90 % of the step between the first and last sample.
    RiseTime,
    /// Percent of the step by which the signal passes its final value.
    Overshoot,
    /// Time after which the signal stays within 2 % of the step around its
    /// final value, measured from the first sample.
    SettlingTime,
    PeakGainDb,
    /// Gain at the lowest swept frequency.
    DcGainDb,
    /// First frequency where the gain falls 3 dB below the DC gain.
    Bandwidth3Db,
    UnityGainFreq,
    PhaseAtUnityGain,
    /// 180° plus the phase at unity gain.
    PhaseMargin,
}

use Metric::*;

impl Metric {
    pub const TRANSIENT: &'static [Metric] = &[
        Max,
        Min,
        PeakToPeak,
        Average,
        Rms,
        FinalValue,
        RiseTime,
        Overshoot,
        SettlingTime,
    ];
    pub const SWEEP: &'static [Metric] = &[Max, Min, PeakToPeak, Average, FinalValue];
    pub const AC: &'static [Metric] = &[
        DcGainDb,
        PeakGainDb,
        Bandwidth3Db,
        UnityGainFreq,
        PhaseAtUnityGain,
        PhaseMargin,
    ];

    /// Parse a metric name. Spaces and dashes count as underscores and a few
    /// short aliases (`pp`, `avg`, `ugf`, `f3db`) are accepted.
    pub fn parse(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let metric = match normalized.as_str() {
            "max" | "maximum" => Max,
            "min" | "minimum" => Min,
            "peak_to_peak" | "pp" | "p2p" => PeakToPeak,
            "average" | "avg" | "mean" => Average,
            "rms" => Rms,
            "final_value" | "final" => FinalValue,
            "rise_time" => RiseTime,
            "overshoot" => Overshoot,
            "settling_time" => SettlingTime,
            "peak_gain_db" | "peak_gain" => PeakGainDb,
            "dc_gain_db" | "dc_gain" => DcGainDb,
            "bandwidth_3db" | "bandwidth" | "f3db" => Bandwidth3Db,
            "unity_gain_freq" | "unity_gain_frequency" | "ugf" => UnityGainFreq,
            "phase_at_unity_gain" => PhaseAtUnityGain,
            "phase_margin" => PhaseMargin,
            _ => return Err(Error::UnknownMetric(name.to_string())),
        };
        Ok(metric)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Max => "max",
            Min => "min",
            PeakToPeak => "peak_to_peak",
            Average => "average",
            Rms => "rms",
            FinalValue => "final_value",
            RiseTime => "rise_time",
            Overshoot => "overshoot",
            SettlingTime => "settling_time",
            PeakGainDb => "peak_gain_db",
            DcGainDb => "dc_gain_db",
            Bandwidth3Db => "bandwidth_3db",
            UnityGainFreq => "unity_gain_freq",
            PhaseAtUnityGain => "phase_at_unity_gain",
            PhaseMargin => "phase_margin",
        }
    }

    /// Metrics reported when the caller does not ask for specific ones.
    pub fn defaults_for(kind: AnalysisKind) -> &'static [Metric] {
        match kind {
            AnalysisKind::Transient => Self::TRANSIENT,
            AnalysisKind::Ac => Self::AC,
            _ => Self::SWEEP,
        }
    }

    fn is_frequency_domain(self) -> bool {
        Self::AC.contains(&self)
    }

    fn is_step_response(self) -> bool {
        matches!(self, RiseTime | Overshoot | SettlingTime)
    }

    fn unit(self, signal_unit: &'static str) -> &'static str {
        match self {
            Max | Min | PeakToPeak | Average | Rms | FinalValue => signal_unit,
            RiseTime | SettlingTime => "s",
            Overshoot => "%",
            PeakGainDb | DcGainDb => "dB",
            Bandwidth3Db | UnityGainFreq => "Hz",
            PhaseAtUnityGain | PhaseMargin => "deg",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluated metric.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub metric: String,
    pub value: Option<f64>,
    pub unit: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseReport {
    pub signal: String,
    pub analysis: AnalysisKind,
    pub points: usize,
    pub measurements: Vec<Measurement>,
}

impl ResponseReport {
    pub fn get(&self, metric: Metric) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.metric == metric.as_str())
    }

    /// Value of a metric, if it was requested and could be evaluated.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.get(metric).and_then(|m| m.value)
    }
}

/// Evaluate `metrics` (or the defaults for the result's analysis kind) on
/// `signal`. Fails only when the signal is not in the result.
pub fn measure_response(
    result: &CachedAnalysisResult,
    signal: &str,
    metrics: &[String],
) -> Result<ResponseReport> {
    let y = result.require_signal(signal)?;
    let signal_unit = signal_unit(signal);

    let requested: Vec<std::result::Result<Metric, (String, Error)>> = if metrics.is_empty() {
        Metric::defaults_for(result.kind()).iter().map(|&m| Ok(m)).collect()
    } else {
        metrics
            .iter()
            .map(|name| Metric::parse(name).map_err(|e| (name.clone(), e)))
            .collect()
    };

    let measurements = requested
        .into_iter()
        .map(|metric| match metric {
            Ok(metric) => match evaluate(metric, result, signal, y) {
                Ok(value) => Measurement {
                    metric: metric.as_str().to_string(),
                    value: Some(value),
                    unit: metric.unit(signal_unit),
                    error: None,
                },
                Err(e) => {
                    debug!(%metric, error = %e, "metric not measurable");
                    Measurement {
                        metric: metric.as_str().to_string(),
                        value: None,
                        unit: metric.unit(signal_unit),
                        error: Some(e.to_string()),
                    }
                }
            },
            Err((name, e)) => Measurement {
                metric: name,
                value: None,
                unit: "",
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok(ResponseReport {
        signal: signal.to_string(),
        analysis: result.kind(),
        points: result.len(),
        measurements,
    })
}

fn signal_unit(signal: &str) -> &'static str {
    let lower = signal.trim().to_ascii_lowercase();
    if lower.starts_with("v(") {
        "V"
    } else if lower.starts_with("i(") {
        "A"
    } else if lower.starts_with("z(") {
        "ohm"
    } else {
        ""
    }
}

fn evaluate(metric: Metric, result: &CachedAnalysisResult, signal: &str, y: &[f64]) -> Result<f64> {
    let kind = result.kind();
    if metric.is_frequency_domain() {
        if kind != AnalysisKind::Ac {
            return Err(Error::WrongAnalysis {
                operation: metric.as_str(),
                expected: "ac",
                actual: kind.to_string(),
            });
        }
    } else if metric.is_step_response() {
        if kind != AnalysisKind::Transient {
            return Err(Error::WrongAnalysis {
                operation: metric.as_str(),
                expected: "transient",
                actual: kind.to_string(),
            });
        }
    } else if kind == AnalysisKind::Ac {
        return Err(Error::WrongAnalysis {
            operation: metric.as_str(),
            expected: "transient or sweep",
            actual: kind.to_string(),
        });
    }

    if y.is_empty() {
        return Err(Error::TooFewPoints { needed: 1, got: 0 });
    }
    let x = result.x_values();

    match metric {
        Max => Ok(max(y)),
        Min => Ok(min(y)),
        PeakToPeak => Ok(max(y) - min(y)),
        Average => Ok(time_average(x, y)),
        Rms => {
            let squares: Vec<f64> = y.iter().map(|v| v * v).collect();
            Ok(time_average(x, &squares).sqrt())
        }
        FinalValue => Ok(y[y.len() - 1]),
        RiseTime => rise_time(x, y),
        Overshoot => overshoot(y),
        SettlingTime => settling_time(x, y),
        PeakGainDb => Ok(max(&gain_db(result, signal)?)),
        DcGainDb => Ok(gain_db(result, signal)?[0]),
        Bandwidth3Db => {
            let db = gain_db(result, signal)?;
            crossing_log_freq(x, &db, db[0] - 3.0, Edge::Fall).ok_or_else(|| {
                Error::NotMeasurable(
                    "gain never falls 3 dB below its low-frequency value in the swept range"
                        .to_string(),
                )
            })
        }
        UnityGainFreq => unity_gain_freq(result, signal),
        PhaseAtUnityGain => phase_at_unity_gain(result, signal),
        PhaseMargin => Ok(180.0 + phase_at_unity_gain(result, signal)?),
    }
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Trapezoidal mean over the x span; plain mean when the span is empty.
fn time_average(x: &[f64], y: &[f64]) -> f64 {
    let n = y.len();
    let span = x[n - 1] - x[0];
    if n < 2 || span <= 0.0 {
        return y.iter().sum::<f64>() / n as f64;
    }
    let integral: f64 = (0..n - 1)
        .map(|i| (x[i + 1] - x[i]) * (y[i] + y[i + 1]) / 2.0)
        .sum();
    integral / span
}

/// First and last sample and the step between them.
fn step(y: &[f64]) -> Result<(f64, f64, f64)> {
    let initial = y[0];
    let final_value = y[y.len() - 1];
    let span = final_value - initial;
    let scale = initial.abs().max(final_value.abs());
    if span == 0.0 || span.abs() <= 1e-9 * scale {
        return Err(Error::NotMeasurable(
            "signal has no step between its first and last sample".to_string(),
        ));
    }
    Ok((initial, final_value, span))
}

fn rise_time(x: &[f64], y: &[f64]) -> Result<f64> {
    let (initial, _, span) = step(y)?;
    let edge = if span > 0.0 { Edge::Rise } else { Edge::Fall };
    let t10 = find_crossing(x, y, initial + 0.1 * span, edge);
    let t90 = find_crossing(x, y, initial + 0.9 * span, edge);
    match (t10, t90) {
        (Some(t10), Some(t90)) => Ok(t90 - t10),
        _ => Err(Error::NotMeasurable(
            "no 10 % / 90 % crossing found".to_string(),
        )),
    }
}

fn overshoot(y: &[f64]) -> Result<f64> {
    let (_, final_value, span) = step(y)?;
    let excess = if span > 0.0 {
        max(y) - final_value
    } else {
        final_value - min(y)
    };
    Ok((excess / span.abs() * 100.0).max(0.0))
}

fn settling_time(x: &[f64], y: &[f64]) -> Result<f64> {
    let (_, final_value, span) = step(y)?;
    let band = SETTLING_BAND * span.abs();
    match y.iter().rposition(|v| (v - final_value).abs() > band) {
        Some(i) if i + 1 < y.len() => Ok(x[i + 1] - x[0]),
        Some(_) => Err(Error::NotMeasurable(
            "signal does not settle within the simulated time".to_string(),
        )),
        None => Ok(0.0),
    }
}

fn gain_db(result: &CachedAnalysisResult, signal: &str) -> Result<Vec<f64>> {
    Ok(result
        .magnitude(signal)?
        .iter()
        .map(|m| 20.0 * m.log10())
        .collect())
}

fn unity_gain_freq(result: &CachedAnalysisResult, signal: &str) -> Result<f64> {
    let db = gain_db(result, signal)?;
    crossing_log_freq(result.x_values(), &db, 0.0, Edge::Fall)
        .ok_or_else(|| Error::NotMeasurable("gain never crosses 0 dB in the swept range".to_string()))
}

fn phase_at_unity_gain(result: &CachedAnalysisResult, signal: &str) -> Result<f64> {
    let re = result.require_signal(signal)?;
    let im = result
        .imag(signal)
        .ok_or_else(|| Error::NotComplex(signal.to_string()))?;
    let phase: Vec<f64> = unwrap_phase(&wrapped_phase(re, im))
        .into_iter()
        .map(f64::to_degrees)
        .collect();
    let ugf = unity_gain_freq(result, signal)?;
    Ok(interpolate_log_freq(result.x_values(), &phase, ugf))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Rise,
    Fall,
}

/// x at the first crossing of `threshold`, linearly interpolated.
fn find_crossing(x: &[f64], y: &[f64], threshold: f64, edge: Edge) -> Option<f64> {
    for i in 0..y.len().saturating_sub(1) {
        let (v0, v1) = (y[i], y[i + 1]);
        let crossed = match edge {
            Edge::Rise => v0 < threshold && v1 >= threshold,
            Edge::Fall => v0 > threshold && v1 <= threshold,
        };
        if crossed {
            if (v1 - v0).abs() < 1e-30 {
                return Some(x[i]);
            }
            let alpha = (threshold - v0) / (v1 - v0);
            return Some(x[i] + alpha * (x[i + 1] - x[i]));
        }
    }
    None
}

/// Crossing frequency, interpolated on a logarithmic frequency axis.
fn crossing_log_freq(freqs: &[f64], y: &[f64], threshold: f64, edge: Edge) -> Option<f64> {
    let log_f: Vec<f64> = freqs.iter().map(|f| f.ln()).collect();
    find_crossing(&log_f, y, threshold, edge).map(f64::exp)
}

/// y at `target`, interpolating linearly in ln(f); clamps outside the sweep.
fn interpolate_log_freq(freqs: &[f64], y: &[f64], target: f64) -> f64 {
    let n = freqs.len();
    if target <= freqs[0] {
        return y[0];
    }
    if target >= freqs[n - 1] {
        return y[n - 1];
    }
    for i in 0..n - 1 {
        let (f0, f1) = (freqs[i], freqs[i + 1]);
        if target >= f0 && target <= f1 {
            let alpha = (target.ln() - f0.ln()) / (f1.ln() - f0.ln());
            return y[i] * (1.0 - alpha) + y[i + 1] * alpha;
        }
    }
    y[n - 1]
}
