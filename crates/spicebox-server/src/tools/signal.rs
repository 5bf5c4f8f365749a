//! Read-only tools over the cached result: group delay, response metrics and
//! raw signal export.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use spicebox_signal::{ResponseReport, group_delay, measure_response};

use super::{Schema, finite_or_null, image_format, string, string_list};
use crate::args::{ToolArgs, parse_args, require_non_empty};
use crate::dispatcher::{ToolDispatcher, ToolSpec};
use crate::error::{Result, ToolError};
use crate::plot::{AxisScale, ImageFormat, PlotRequest, Series};
use crate::response::ToolResponse;

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "calculate_group_delay",
            "Group delay -dphi/domega of a signal from the most recent AC analysis, with a plot.",
            Schema::new()
                .circuit_id()
                .required("signal", string("AC signal, e.g. v(out)"))
                .optional("format", image_format())
                .build(),
            calculate_group_delay,
        ),
        ToolSpec::new(
            "measure_response",
            "Measure a signal of the most recent analysis: extrema, average, rms, rise time, overshoot, \
             settling time, or for AC results gain, bandwidth, unity-gain frequency and phase margin.",
            Schema::new()
                .circuit_id()
                .required("signal", string("Signal to measure"))
                .optional("metrics", string_list("Metric names; defaults depend on the analysis"))
                .build(),
            measure_response_tool,
        ),
        ToolSpec::new(
            "get_results",
            "Return the raw samples of the most recent analysis.",
            Schema::new()
                .circuit_id()
                .optional("signals", string_list("Signals to return; default all"))
                .build(),
            get_results,
        ),
    ]
}

#[derive(Deserialize)]
struct GroupDelayArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    signal: String,
    #[serde(default)]
    format: Option<String>,
}

impl GroupDelayArgs {
    fn format(&self, default: ImageFormat) -> Result<ImageFormat> {
        match &self.format {
            Some(token) => ImageFormat::parse(token).ok_or_else(|| {
                ToolError::validation(format!("format must be 'png' or 'svg', got '{}'", token))
            }),
            None => Ok(default),
        }
    }
}

impl ToolArgs for GroupDelayArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("signal", &self.signal)?;
        self.format(ImageFormat::Png).map(|_| ())
    }
}

fn calculate_group_delay(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: GroupDelayArgs = parse_args("calculate_group_delay", arguments)?;
    let format = args.format(d.config().default_image_format)?;
    let id = d.registry().resolve(args.circuit_id.as_deref())?;
    let result = d.registry().result(&id)?;

    let delay = group_delay(&result, args.signal.trim())?;
    let request = PlotRequest::new(
        format!("Group Delay: {}", args.signal),
        "Frequency (Hz)",
        "Group delay (s)",
    )
    .with_size(d.config().plot_width, d.config().plot_height)
    .with_x_scale(AxisScale::Log)
    .with_series(Series::new(
        args.signal.clone(),
        delay.frequencies.clone(),
        delay.delay.clone(),
    ));
    let plot = d.render(&request, format)?;

    let response = ToolResponse::json(&json!({
        "circuit_id": id,
        "signal": args.signal,
        "points": delay.frequencies.len(),
        "min_delay": delay.min_delay,
        "max_delay": delay.max_delay,
        "mean_delay": delay.mean_delay,
        "frequencies": delay.frequencies,
        "group_delay": finite_or_null(&delay.delay),
    }))?;
    Ok(response.with_plot(&plot))
}

#[derive(Deserialize)]
struct MeasureArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    signal: String,
    #[serde(default)]
    metrics: Vec<String>,
}

impl ToolArgs for MeasureArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("signal", &self.signal)
    }
}

#[derive(Serialize)]
struct MeasureSummary<'a> {
    circuit_id: &'a str,
    #[serde(flatten)]
    report: &'a ResponseReport,
}

fn measure_response_tool(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: MeasureArgs = parse_args("measure_response", arguments)?;
    let id = d.registry().resolve(args.circuit_id.as_deref())?;
    let result = d.registry().result(&id)?;

    let report = measure_response(&result, args.signal.trim(), &args.metrics)?;
    ToolResponse::json(&MeasureSummary {
        circuit_id: &id,
        report: &report,
    })
}

#[derive(Deserialize)]
struct GetResultsArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    #[serde(default)]
    signals: Vec<String>,
}

impl ToolArgs for GetResultsArgs {}

fn get_results(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: GetResultsArgs = parse_args("get_results", arguments)?;
    let id = d.registry().resolve(args.circuit_id.as_deref())?;
    let result = d.registry().result(&id)?;

    let names = if args.signals.is_empty() {
        result.signal_names()
    } else {
        args.signals.iter().map(|s| s.trim().to_string()).collect()
    };
    let mut signals = Map::new();
    for name in names {
        let re = result.require_signal(&name)?;
        let value = match result.imag(&name) {
            Some(im) => json!({"real": finite_or_null(re), "imag": finite_or_null(im)}),
            None => json!(finite_or_null(re)),
        };
        signals.insert(name, value);
    }
    ToolResponse::json(&json!({
        "circuit_id": id,
        "analysis": result.kind(),
        "x_label": result.x_label(),
        "points": result.len(),
        "x_values": result.x_values(),
        "signals": signals,
        "scalars": result.scalars(),
    }))
}
