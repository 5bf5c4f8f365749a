//! Parameter and temperature sweeps.
//!
//! Both repeat one analysis per sweep point, reduce each run to a single
//! number per output and cache the collected series as one real-valued
//! result whose x axis is the swept quantity.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use spicebox_core::{AnalysisKind, CachedAnalysisResult, Circuit};
use tracing::info;

use super::analysis::resolve_signals;
use super::{Schema, integer, number, numeric, string, string_list};
use crate::args::{Numeric, ToolArgs, parse_args, require_items, require_non_empty};
use crate::dispatcher::{ToolDispatcher, ToolSpec};
use crate::error::{Result, ToolError};
use crate::response::ToolResponse;
use crate::sweep::{SweepAnalysis, SweepRange, SweepScale};

const MAX_SWEEP_POINTS: usize = 1000;

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "run_parameter_sweep",
            "Step a component value and record outputs of an op, single-frequency ac or transient run at each step.",
            analysis_fields(
                Schema::new()
                    .circuit_id()
                    .required("component", string("Component whose value is swept"))
                    .required("start", numeric("First value"))
                    .required("stop", numeric("Last value"))
                    .required("points", integer("Number of sweep points, at least 2"))
                    .optional(
                        "scale",
                        json!({"type": "string", "enum": ["linear", "log"], "description": "Point spacing; default linear"}),
                    ),
            )
            .build(),
            run_parameter_sweep,
        ),
        ToolSpec::new(
            "run_temperature_sweep",
            "Step the circuit temperature (°C) and record outputs at each step.",
            analysis_fields(
                Schema::new()
                    .circuit_id()
                    .required("start_temp", number("First temperature in °C"))
                    .required("stop_temp", number("Last temperature in °C"))
                    .required("points", integer("Number of sweep points, at least 2")),
            )
            .build(),
            run_temperature_sweep,
        ),
    ]
}

fn analysis_fields(schema: Schema) -> Schema {
    schema
        .required(
            "analysis_type",
            json!({"type": "string", "enum": ["op", "ac", "transient"], "description": "Analysis run at each point"}),
        )
        .required("outputs", string_list("Signals recorded at each point, e.g. v(out)"))
        .optional("frequency", number("Frequency for ac, default 1 kHz"))
        .optional("tstop", number("Stop time for transient, default 1 ms"))
        .optional("tstep", number("Time step for transient, default 10 us"))
}

/// Fields shared by both sweep tools.
#[derive(Debug, Deserialize)]
struct PerPoint {
    analysis_type: String,
    outputs: Vec<String>,
    #[serde(default)]
    frequency: Option<f64>,
    #[serde(default)]
    tstop: Option<f64>,
    #[serde(default)]
    tstep: Option<f64>,
}

impl PerPoint {
    fn analysis(&self) -> Result<SweepAnalysis> {
        SweepAnalysis::parse(&self.analysis_type, self.frequency, self.tstop, self.tstep)
    }

    fn validate(&self) -> Result<()> {
        require_items("outputs", &self.outputs)?;
        self.analysis().map(|_| ())
    }
}

/// Read the JSON `points` value as a count. Anything that is not a whole,
/// non-negative number is rejected here so the message names the field.
fn point_count(points: f64) -> Result<usize> {
    if !points.is_finite() || points < 0.0 || points.fract() != 0.0 {
        return Err(ToolError::validation(format!(
            "points must be a whole number of at least 2, got {}",
            points
        )));
    }
    if points > MAX_SWEEP_POINTS as f64 {
        return Err(ToolError::validation(format!(
            "points must not exceed {}, got {}",
            MAX_SWEEP_POINTS, points
        )));
    }
    Ok(points as usize)
}

/// Run `run_at` for every value and sample each output.
fn collect(
    analysis: SweepAnalysis,
    outputs: &[String],
    values: &[f64],
    mut run_at: impl FnMut(f64) -> Result<CachedAnalysisResult>,
) -> Result<Vec<Vec<f64>>> {
    let mut columns = vec![Vec::with_capacity(values.len()); outputs.len()];
    for &value in values {
        let result = run_at(value)?;
        for (column, output) in columns.iter_mut().zip(outputs) {
            column.push(analysis.sample(&result, output)?);
        }
    }
    Ok(columns)
}

fn store(
    d: &ToolDispatcher,
    circuit: &Circuit,
    kind: AnalysisKind,
    x_label: &str,
    values: Vec<f64>,
    outputs: &[String],
    columns: Vec<Vec<f64>>,
) -> Result<Map<String, Value>> {
    let mut builder = CachedAnalysisResult::builder(kind, x_label, values);
    let mut summary = Map::new();
    for (output, column) in outputs.iter().zip(columns) {
        summary.insert(output.clone(), json!(super::finite_or_null(&column)));
        builder = builder.real_signal(output.clone(), column);
    }
    let result = d.registry().store_result(circuit.id(), builder.build()?)?;
    info!(circuit = circuit.id(), kind = %kind, points = result.len(), "sweep stored");
    Ok(summary)
}

/// Prefix an engine failure with the sweep point it happened at.
fn at_point(label: &str, value: f64) -> impl Fn(ToolError) -> ToolError + '_ {
    move |e| match e {
        ToolError::Engine(message) => ToolError::Engine(format!("{} = {}: {}", label, value, message)),
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct ParameterSweepArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    component: String,
    start: Numeric,
    stop: Numeric,
    points: f64,
    #[serde(default)]
    scale: Option<String>,
    #[serde(flatten)]
    per_point: PerPoint,
}

impl ParameterSweepArgs {
    fn range(&self) -> Result<SweepRange> {
        let scale = match &self.scale {
            Some(token) => SweepScale::parse(token)?,
            None => SweepScale::Linear,
        };
        SweepRange::new(
            self.start.resolve("start")?,
            self.stop.resolve("stop")?,
            point_count(self.points)?,
            scale,
        )
    }
}

impl ToolArgs for ParameterSweepArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("component", &self.component)?;
        self.range()?;
        self.per_point.validate()
    }
}

fn run_parameter_sweep(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: ParameterSweepArgs = parse_args("run_parameter_sweep", arguments)?;
    let range = args.range()?;
    let analysis = args.per_point.analysis()?;
    let circuit = d.circuit(args.circuit_id.as_deref())?;

    let component = circuit.component(args.component.trim()).ok_or_else(|| {
        ToolError::validation(format!(
            "component '{}' not found in circuit '{}'",
            args.component.trim(),
            circuit.id()
        ))
    })?;
    if !(component.kind.requires_value() || component.kind.is_source()) {
        return Err(ToolError::validation(format!(
            "component '{}' is a {} and has no value to sweep",
            component.name, component.kind
        )));
    }
    if component.kind.requires_value() && range.start <= 0.0 {
        return Err(ToolError::validation(format!(
            "{} values must be positive; start is {}",
            component.kind, range.start
        )));
    }
    let name = component.name.clone();
    let outputs = resolve_signals(&circuit, "outputs", &args.per_point.outputs)?;

    let values = range.values();
    let options = d.options();
    let request = analysis.request();
    let columns = collect(analysis, &outputs, &values, |value| {
        let mut stepped = circuit.clone();
        if let Some(c) = stepped.component_mut(&name) {
            c.value = Some(value);
        }
        d.simulate(&stepped, &request, &options).map_err(at_point(&name, value))
    })?;
    let series = store(
        d,
        &circuit,
        AnalysisKind::ParameterSweep,
        &name,
        values.clone(),
        &outputs,
        columns,
    )?;

    ToolResponse::json(&json!({
        "analysis": "parameter_sweep",
        "circuit_id": circuit.id(),
        "component": name,
        "analysis_type": analysis.as_str(),
        "scale": range.scale.to_string(),
        "points": values.len(),
        "values": values,
        "outputs": series,
    }))
}

#[derive(Deserialize)]
struct TemperatureSweepArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    start_temp: f64,
    stop_temp: f64,
    points: f64,
    #[serde(flatten)]
    per_point: PerPoint,
}

impl TemperatureSweepArgs {
    fn range(&self) -> Result<SweepRange> {
        SweepRange::new(
            self.start_temp,
            self.stop_temp,
            point_count(self.points)?,
            SweepScale::Linear,
        )
    }
}

impl ToolArgs for TemperatureSweepArgs {
    fn validate(&self) -> Result<()> {
        self.range()?;
        if self.start_temp < -273.15 {
            return Err(ToolError::validation(format!(
                "start_temp {} is below absolute zero",
                self.start_temp
            )));
        }
        self.per_point.validate()
    }
}

fn run_temperature_sweep(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: TemperatureSweepArgs = parse_args("run_temperature_sweep", arguments)?;
    let range = args.range()?;
    let analysis = args.per_point.analysis()?;
    let circuit = d.circuit(args.circuit_id.as_deref())?;
    let outputs = resolve_signals(&circuit, "outputs", &args.per_point.outputs)?;

    let temperatures = range.values();
    let options = d.options();
    let request = analysis.request();
    let columns = collect(analysis, &outputs, &temperatures, |t| {
        d.simulate(&circuit, &request, &options.with_temperature(t))
            .map_err(at_point("temperature", t))
    })?;
    let series = store(
        d,
        &circuit,
        AnalysisKind::TemperatureSweep,
        "temperature",
        temperatures.clone(),
        &outputs,
        columns,
    )?;

    ToolResponse::json(&json!({
        "analysis": "temperature_sweep",
        "circuit_id": circuit.id(),
        "analysis_type": analysis.as_str(),
        "points": temperatures.len(),
        "temperatures": temperatures,
        "outputs": series,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep_args(extra: Value) -> Value {
        let mut args = json!({
            "component": "R1",
            "start": 100,
            "stop": 10000,
            "points": 5,
            "analysis_type": "op",
            "outputs": ["v(out)"],
        });
        if let (Some(base), Some(extra)) = (args.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        args
    }

    fn error(extra: Value) -> String {
        parse_args::<ParameterSweepArgs>("run_parameter_sweep", sweep_args(extra))
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_parameter_sweep_rejections() {
        let err = error(json!({"start": 10000, "stop": 100}));
        assert!(err.contains("start") && err.contains("stop"), "{}", err);

        let err = error(json!({"points": 1}));
        assert!(err.contains("points"), "{}", err);

        let err = error(json!({"start": -100, "stop": 100, "scale": "log"}));
        assert!(err.contains("log") && err.contains("positive"), "{}", err);

        let err = error(json!({"analysis_type": "noise"}));
        assert!(err.contains("Unsupported analysis type"), "{}", err);

        let err = error(json!({"points": 5000}));
        assert!(err.contains("points"), "{}", err);

        for bad in [json!(-1), json!(0.5), json!(0)] {
            let err = error(json!({ "points": bad }));
            assert!(err.contains("points"), "{}", err);
        }
    }

    #[test]
    fn test_flattened_fields_are_required() {
        let mut args = sweep_args(json!({}));
        if let Some(map) = args.as_object_mut() {
            map.remove("analysis_type");
        }
        let err = parse_args::<ParameterSweepArgs>("run_parameter_sweep", args).unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(ref f) if f == "analysis_type"));
    }

    #[test]
    fn test_engine_errors_name_the_point() {
        let err = at_point("R1", 50.0)(ToolError::Engine("singular".into()));
        assert_eq!(err.to_string(), "Simulation failed: R1 = 50: singular");
    }
}
