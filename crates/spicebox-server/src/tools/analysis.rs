//! Tools that run one analysis through the engine and cache its result.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use spicebox_core::{AcSweep, AcSweepType, AnalysisRequest, CachedAnalysisResult, Circuit};
use tracing::{info, warn};

use super::{CircuitArgs, Schema, finite_or_null, integer, numeric, stats, string, string_list};
use crate::args::{Numeric, ToolArgs, parse_args, require_non_empty};
use crate::dispatcher::{ToolDispatcher, ToolSpec};
use crate::error::{Result, ToolError};
use crate::response::ToolResponse;

/// Upper bound on samples produced by a single DC or transient run.
const MAX_POINTS: f64 = 1_000_000.0;

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "run_op_analysis",
            "Compute the DC operating point: every node voltage and source current.",
            Schema::new().circuit_id().build(),
            run_op_analysis,
        ),
        ToolSpec::new(
            "run_dc_analysis",
            "Sweep the DC value of an independent source and record the exported signals.",
            Schema::new()
                .circuit_id()
                .required("source", string("Voltage or current source to sweep"))
                .required("start", numeric("First source value"))
                .required("stop", numeric("Last source value"))
                .required("step", numeric("Increment, must be positive"))
                .required("exports", string_list("Signals to report, e.g. v(out), i(V1); empty for all"))
                .build(),
            run_dc_analysis,
        ),
        ToolSpec::new(
            "run_ac_analysis",
            "Small-signal frequency sweep. Sources excite the circuit through their 'ac' parameter.",
            Schema::new()
                .circuit_id()
                .required("start_freq", numeric("Start frequency in Hz"))
                .required("stop_freq", numeric("Stop frequency in Hz"))
                .optional("points_per_decade", integer("Points per decade (or per octave, or in total for lin); default 10"))
                .optional(
                    "sweep_type",
                    json!({"type": "string", "enum": ["dec", "oct", "lin"], "description": "Sweep spacing; default dec"}),
                )
                .build(),
            run_ac_analysis,
        ),
        ToolSpec::new(
            "run_transient_analysis",
            "Time-domain simulation from 0 to stop.",
            Schema::new()
                .circuit_id()
                .required("step", numeric("Time step in seconds"))
                .required("stop", numeric("Stop time in seconds"))
                .optional("start", numeric("First reported time; default 0"))
                .optional("exports", string_list("Signals to summarize; default all"))
                .build(),
            run_transient_analysis,
        ),
    ]
}

/// Canonical names for `names`, failing on any signal `circuit` cannot
/// produce.
pub(super) fn resolve_signals(circuit: &Circuit, field: &str, names: &[String]) -> Result<Vec<String>> {
    let available = circuit.signal_names();
    names
        .iter()
        .map(|name| {
            available
                .iter()
                .find(|s| s.eq_ignore_ascii_case(name.trim()))
                .cloned()
                .ok_or_else(|| {
                    ToolError::validation(format!(
                        "{} entry '{}' is not a signal of circuit '{}' (available: {})",
                        field,
                        name,
                        circuit.id(),
                        available.join(", ")
                    ))
                })
        })
        .collect()
}

/// `requested`, or every signal of the result when it is empty.
fn exported(result: &CachedAnalysisResult, requested: Vec<String>) -> Vec<String> {
    if requested.is_empty() {
        result.signal_names()
    } else {
        requested
    }
}

fn run_op_analysis(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: CircuitArgs = parse_args("run_op_analysis", arguments)?;
    let circuit = d.circuit(args.circuit_id.as_deref())?;

    let result = d.simulate(&circuit, &AnalysisRequest::OperatingPoint, &d.options())?;
    let result = d.registry().store_result(circuit.id(), result)?;
    info!(circuit = circuit.id(), "operating point stored");

    ToolResponse::json(&json!({
        "analysis": "op",
        "circuit_id": circuit.id(),
        "values": result.scalars(),
    }))
}

#[derive(Debug, Deserialize)]
struct DcArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    source: String,
    start: Numeric,
    stop: Numeric,
    step: Numeric,
    exports: Vec<String>,
}

impl DcArgs {
    fn range(&self) -> Result<(f64, f64, f64)> {
        Ok((
            self.start.resolve("start")?,
            self.stop.resolve("stop")?,
            self.step.resolve("step")?,
        ))
    }
}

impl ToolArgs for DcArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("source", &self.source)?;
        let (start, stop, step) = self.range()?;
        if step <= 0.0 {
            return Err(ToolError::validation(format!("step must be positive, got {}", step)));
        }
        if start > stop {
            return Err(ToolError::validation(format!(
                "start ({}) must not be greater than stop ({})",
                start, stop
            )));
        }
        if (stop - start) / step > MAX_POINTS {
            return Err(ToolError::validation(format!(
                "step {} is too small for the range {}..{}",
                step, start, stop
            )));
        }
        Ok(())
    }
}

fn run_dc_analysis(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: DcArgs = parse_args("run_dc_analysis", arguments)?;
    let (start, stop, step) = args.range()?;
    let circuit = d.circuit(args.circuit_id.as_deref())?;

    let source = args.source.trim();
    match circuit.component(source) {
        Some(c) if c.kind.is_source() => {}
        Some(c) => {
            return Err(ToolError::validation(format!(
                "'{}' is a {}, not an independent source",
                c.name, c.kind
            )));
        }
        None => {
            return Err(ToolError::validation(format!(
                "source '{}' not found in circuit '{}'",
                source,
                circuit.id()
            )));
        }
    }
    let exports = resolve_signals(&circuit, "exports", &args.exports)?;

    let request = AnalysisRequest::DcSweep {
        source: source.to_string(),
        start,
        stop,
        step,
    };
    let result = d.simulate(&circuit, &request, &d.options())?;
    let result = d.registry().store_result(circuit.id(), result)?;
    info!(circuit = circuit.id(), points = result.len(), "dc sweep stored");

    let mut series = Map::new();
    for name in exported(&result, exports) {
        let values = result.require_signal(&name)?;
        series.insert(name, json!(finite_or_null(values)));
    }
    ToolResponse::json(&json!({
        "analysis": "dc",
        "circuit_id": circuit.id(),
        "source": source,
        "points": result.len(),
        "sweep": result.x_values(),
        "exports": series,
    }))
}

#[derive(Debug, Deserialize)]
struct AcArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    start_freq: Numeric,
    stop_freq: Numeric,
    #[serde(default = "default_points_per_decade")]
    points_per_decade: usize,
    #[serde(default)]
    sweep_type: Option<String>,
}

fn default_points_per_decade() -> usize {
    10
}

impl AcArgs {
    fn sweep(&self) -> Result<AcSweep> {
        let sweep_type = match &self.sweep_type {
            Some(token) => AcSweepType::parse(token).ok_or_else(|| {
                ToolError::validation(format!(
                    "sweep_type must be 'dec', 'oct' or 'lin', got '{}'",
                    token
                ))
            })?,
            None => AcSweepType::Decade,
        };
        let sweep = AcSweep {
            sweep_type,
            points: self.points_per_decade,
            start: self.start_freq.resolve("start_freq")?,
            stop: self.stop_freq.resolve("stop_freq")?,
        };
        sweep.validate()?;
        Ok(sweep)
    }
}

impl ToolArgs for AcArgs {
    fn validate(&self) -> Result<()> {
        self.sweep().map(|_| ())
    }
}

fn run_ac_analysis(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: AcArgs = parse_args("run_ac_analysis", arguments)?;
    let sweep = args.sweep()?;
    let circuit = d.circuit(args.circuit_id.as_deref())?;

    if !circuit
        .components()
        .iter()
        .any(|c| c.kind.is_source() && c.parameter("ac").is_some_and(|v| v != 0.0))
    {
        warn!(circuit = circuit.id(), "no source carries an ac magnitude; response will be zero");
    }

    let result = d.simulate(&circuit, &AnalysisRequest::Ac(sweep), &d.options())?;
    let result = d.registry().store_result(circuit.id(), result)?;
    info!(circuit = circuit.id(), points = result.len(), "ac sweep stored");

    ToolResponse::json(&json!({
        "analysis": "ac",
        "circuit_id": circuit.id(),
        "sweep_type": sweep.sweep_type,
        "start_freq": sweep.start,
        "stop_freq": sweep.stop,
        "points": result.len(),
        "signals": result.signal_names(),
    }))
}

#[derive(Debug, Deserialize)]
struct TransientArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    step: Numeric,
    stop: Numeric,
    #[serde(default)]
    start: Option<Numeric>,
    #[serde(default)]
    exports: Vec<String>,
}

impl TransientArgs {
    fn times(&self) -> Result<(f64, f64, f64)> {
        let start = match &self.start {
            Some(v) => v.resolve("start")?,
            None => 0.0,
        };
        Ok((self.step.resolve("step")?, self.stop.resolve("stop")?, start))
    }
}

impl ToolArgs for TransientArgs {
    fn validate(&self) -> Result<()> {
        let (step, stop, start) = self.times()?;
        if step <= 0.0 {
            return Err(ToolError::validation(format!("step must be positive, got {}", step)));
        }
        if start < 0.0 {
            return Err(ToolError::validation(format!("start must not be negative, got {}", start)));
        }
        if stop <= start {
            return Err(ToolError::validation(format!(
                "stop ({}) must be greater than start ({})",
                stop, start
            )));
        }
        if stop / step > MAX_POINTS {
            return Err(ToolError::validation(format!(
                "step {} is too small for stop {}",
                step, stop
            )));
        }
        Ok(())
    }
}

fn run_transient_analysis(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: TransientArgs = parse_args("run_transient_analysis", arguments)?;
    let (step, stop, start) = args.times()?;
    let circuit = d.circuit(args.circuit_id.as_deref())?;
    let exports = resolve_signals(&circuit, "exports", &args.exports)?;

    let request = AnalysisRequest::Transient { step, stop, start };
    let result = d.simulate(&circuit, &request, &d.options())?;
    let result = d.registry().store_result(circuit.id(), result)?;
    info!(circuit = circuit.id(), points = result.len(), "transient stored");

    let mut signals = Map::new();
    for name in exported(&result, exports) {
        let values = result.require_signal(&name)?;
        let range = stats(values);
        signals.insert(
            name,
            json!({
                "final": values.last().copied().filter(|v| v.is_finite()),
                "min": range.map(|(min, _, _)| min),
                "max": range.map(|(_, max, _)| max),
            }),
        );
    }
    ToolResponse::json(&json!({
        "analysis": "transient",
        "circuit_id": circuit.id(),
        "step": step,
        "stop": stop,
        "start": start,
        "points": result.len(),
        "signals": signals,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dc_rejects_reversed_range() {
        let err = parse_args::<DcArgs>(
            "run_dc_analysis",
            json!({"source": "V1", "start": 5, "stop": 0, "step": 1, "exports": []}),
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("start") && err.contains("stop"), "{}", err);
    }

    #[test]
    fn test_dc_requires_exports() {
        let err = parse_args::<DcArgs>(
            "run_dc_analysis",
            json!({"source": "V1", "start": 0, "stop": 1, "step": 0.1}),
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("exports") && err.contains("required"), "{}", err);
    }

    #[test]
    fn test_ac_defaults() {
        let args: AcArgs =
            parse_args("run_ac_analysis", json!({"start_freq": "10", "stop_freq": "1meg"})).unwrap();
        let sweep = args.sweep().unwrap();
        assert_eq!(sweep.points, 10);
        assert_eq!(sweep.sweep_type, AcSweepType::Decade);
        assert_eq!(sweep.stop, 1e6);

        let err = parse_args::<AcArgs>(
            "run_ac_analysis",
            json!({"start_freq": 10, "stop_freq": 100, "sweep_type": "random"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("sweep_type"));
    }

    #[test]
    fn test_transient_bounds() {
        let err = parse_args::<TransientArgs>("run_transient_analysis", json!({"step": 0, "stop": 1e-3}))
            .unwrap_err();
        assert!(err.to_string().contains("step"));
        let err = parse_args::<TransientArgs>(
            "run_transient_analysis",
            json!({"step": 1e-6, "stop": 1e-3, "start": 2e-3}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("greater than start"));
    }
}
