//! Plots of cached results and of port impedance.

use serde::Deserialize;
use serde_json::{Value, json};
use spicebox_core::{AcSweep, AnalysisKind, CachedAnalysisResult};
use spicebox_signal::{OPEN_PORT_OHMS, impedance_signal, port_impedance};
use tracing::{info, warn};

use super::{Schema, image_format, integer, numeric, stats, string, string_list};
use crate::args::{Numeric, ToolArgs, parse_args, require_items, require_non_empty};
use crate::dispatcher::{ToolDispatcher, ToolSpec, guarded};
use crate::error::{Result, ToolError};
use crate::plot::{AxisScale, ImageFormat, PlotRequest, Series};
use crate::response::{ContentPart, ToolResponse};

const DEFAULT_IMPEDANCE_START: f64 = 10.0;
const DEFAULT_IMPEDANCE_STOP: f64 = 1e6;
const DEFAULT_IMPEDANCE_PPD: usize = 20;

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "plot_results",
            "Plot signals of the most recent analysis. AC signals are drawn as magnitude in dB over a log frequency axis.",
            Schema::new()
                .circuit_id()
                .required("signals", string_list("Signals to plot"))
                .optional("invert_signals", string_list("Signals to negate before plotting"))
                .required("image_format", image_format())
                .required(
                    "output_format",
                    json!({
                        "type": "array",
                        "items": {"type": "string", "enum": ["image", "svg", "data"]},
                        "description": "Parts to return; svg needs image_format svg",
                    }),
                )
                .required(
                    "options",
                    json!({
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "x_label": {"type": "string"},
                            "y_label": {"type": "string"},
                            "width": {"type": "integer"},
                            "height": {"type": "integer"},
                        },
                        "required": ["title", "x_label", "y_label"],
                    }),
                )
                .build(),
            plot_results,
        ),
        ToolSpec::new(
            "plot_impedance",
            "Measure the small-signal impedance between two nodes with a 1 A AC probe and plot |Z| against frequency.",
            Schema::new()
                .circuit_id()
                .required("port_positive", string("Positive port node"))
                .required("port_negative", string("Negative port node, often 0"))
                .optional("start_freq", numeric("Start frequency in Hz; default 10"))
                .optional("stop_freq", numeric("Stop frequency in Hz; default 1 MHz"))
                .optional("points_per_decade", integer("Default 20"))
                .optional("format", image_format())
                .build(),
            plot_impedance,
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Image,
    Svg,
    Data,
}

impl OutputFormat {
    fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(OutputFormat::Image),
            "svg" => Ok(OutputFormat::Svg),
            "data" => Ok(OutputFormat::Data),
            other => Err(ToolError::validation(format!(
                "output_format entries must be 'image', 'svg' or 'data', got '{}'",
                other
            ))),
        }
    }
}

fn parse_image_format(field: &str, token: &str) -> Result<ImageFormat> {
    ImageFormat::parse(token).ok_or_else(|| {
        ToolError::validation(format!("{} must be 'png' or 'svg', got '{}'", field, token))
    })
}

#[derive(Debug, Deserialize)]
struct PlotOptions {
    title: String,
    x_label: String,
    y_label: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PlotResultsArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    signals: Vec<String>,
    #[serde(default)]
    invert_signals: Vec<String>,
    image_format: String,
    output_format: Vec<String>,
    options: PlotOptions,
}

impl PlotResultsArgs {
    fn formats(&self) -> Result<(ImageFormat, Vec<OutputFormat>)> {
        let image = parse_image_format("image_format", &self.image_format)?;
        let outputs = self
            .output_format
            .iter()
            .map(|t| OutputFormat::parse(t))
            .collect::<Result<Vec<_>>>()?;
        if outputs.contains(&OutputFormat::Svg) && image != ImageFormat::Svg {
            return Err(ToolError::validation(
                "output_format 'svg' requires image_format 'svg'",
            ));
        }
        Ok((image, outputs))
    }
}

impl ToolArgs for PlotResultsArgs {
    fn validate(&self) -> Result<()> {
        require_items("signals", &self.signals)?;
        require_items("output_format", &self.output_format)?;
        for invert in &self.invert_signals {
            if !self.signals.iter().any(|s| s.eq_ignore_ascii_case(invert)) {
                return Err(ToolError::validation(format!(
                    "invert_signals entry '{}' is not listed in signals",
                    invert
                )));
            }
        }
        self.formats().map(|_| ())
    }
}

/// Series for `signal`: dB magnitude for AC results, raw values otherwise.
fn signal_series(result: &CachedAnalysisResult, signal: &str, invert: bool) -> Result<Series> {
    let mut y = if result.kind() == AnalysisKind::Ac {
        result
            .magnitude(signal)?
            .into_iter()
            .map(|m| 20.0 * m.log10())
            .collect()
    } else {
        result.require_signal(signal)?.to_vec()
    };
    if invert {
        y.iter_mut().for_each(|v| *v = -*v);
    }
    let name = if invert { format!("-{}", signal) } else { signal.to_string() };
    Ok(Series::new(name, result.x_values().to_vec(), y))
}

fn plot_results(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: PlotResultsArgs = parse_args("plot_results", arguments)?;
    let (image_format, outputs) = args.formats()?;
    let id = d.registry().resolve(args.circuit_id.as_deref())?;
    let result = d.registry().result(&id)?;

    let mut request = PlotRequest::new(&args.options.title, &args.options.x_label, &args.options.y_label)
        .with_size(
            args.options.width.unwrap_or(d.config().plot_width),
            args.options.height.unwrap_or(d.config().plot_height),
        );
    if result.kind() == AnalysisKind::Ac {
        request = request.with_x_scale(AxisScale::Log);
    }
    for signal in &args.signals {
        let invert = args.invert_signals.iter().any(|s| s.eq_ignore_ascii_case(signal));
        request = request.with_series(signal_series(&result, signal.trim(), invert)?);
    }

    let plot = d.render(&request, image_format)?;
    info!(circuit = %id, signals = args.signals.len(), format = image_format.as_str(), "plot rendered");

    let mut response = ToolResponse::json(&json!({
        "circuit_id": id,
        "analysis": result.kind(),
        "signals": args.signals,
        "inverted": args.invert_signals,
        "points": result.len(),
        "image_format": image_format,
        "width": request.width,
        "height": request.height,
        "output_format": args.output_format,
    }))?;
    for output in outputs {
        response = match output {
            OutputFormat::Image => response.with_plot(&plot),
            OutputFormat::Svg => response.with_part(ContentPart::text_with_mime(
                String::from_utf8_lossy(&plot.bytes),
                ImageFormat::Svg.mime_type(),
            )),
            OutputFormat::Data => {
                let series: Vec<Value> = request
                    .series
                    .iter()
                    .map(|s| json!({"name": s.name, "y": super::finite_or_null(&s.y)}))
                    .collect();
                let data = json!({"x_label": result.x_label(), "x": result.x_values(), "series": series});
                response.with_part(ContentPart::text_with_mime(
                    serde_json::to_string(&data)?,
                    "application/json",
                ))
            }
        };
    }
    Ok(response)
}

#[derive(Deserialize)]
struct PlotImpedanceArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    port_positive: String,
    port_negative: String,
    #[serde(default)]
    start_freq: Option<Numeric>,
    #[serde(default)]
    stop_freq: Option<Numeric>,
    #[serde(default)]
    points_per_decade: Option<usize>,
    #[serde(default)]
    format: Option<String>,
}

impl PlotImpedanceArgs {
    fn sweep(&self) -> Result<AcSweep> {
        let freq = |v: &Option<Numeric>, field: &str, default: f64| match v {
            Some(v) => v.resolve(field),
            None => Ok(default),
        };
        let sweep = AcSweep::decade(
            freq(&self.start_freq, "start_freq", DEFAULT_IMPEDANCE_START)?,
            freq(&self.stop_freq, "stop_freq", DEFAULT_IMPEDANCE_STOP)?,
            self.points_per_decade.unwrap_or(DEFAULT_IMPEDANCE_PPD),
        );
        sweep.validate()?;
        Ok(sweep)
    }

    fn format(&self, default: ImageFormat) -> Result<ImageFormat> {
        match &self.format {
            Some(token) => parse_image_format("format", token),
            None => Ok(default),
        }
    }
}

impl ToolArgs for PlotImpedanceArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("port_positive", &self.port_positive)?;
        require_non_empty("port_negative", &self.port_negative)?;
        self.sweep()?;
        self.format(ImageFormat::Png).map(|_| ())
    }
}

fn plot_impedance(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: PlotImpedanceArgs = parse_args("plot_impedance", arguments)?;
    let sweep = args.sweep()?;
    let format = args.format(d.config().default_image_format)?;
    let circuit = d.circuit(args.circuit_id.as_deref())?;
    let (pos, neg) = (args.port_positive.trim(), args.port_negative.trim());

    let options = d.options();
    let impedance = guarded(|| Ok(port_impedance(d.engine(), &circuit, &options, pos, neg, &sweep)?))?;
    d.registry().store_result(circuit.id(), impedance.to_result()?)?;
    let signal = impedance_signal(pos, neg);
    info!(circuit = circuit.id(), signal = %signal, open = impedance.open, "impedance stored");

    let range = stats(&impedance.magnitude);
    let summary = json!({
        "circuit_id": circuit.id(),
        "signal": signal,
        "port_positive": pos,
        "port_negative": neg,
        "points": impedance.frequencies.len(),
        "open": impedance.open,
        "min_magnitude": range.map(|(min, _, _)| min),
        "max_magnitude": range.map(|(_, max, _)| max),
        "frequencies": impedance.frequencies,
        "magnitude": super::finite_or_null(&impedance.magnitude),
        "phase_deg": super::finite_or_null(&impedance.phase),
    });
    let response = ToolResponse::json(&summary)?;

    // An open port is drawn at the open-circuit level instead of being left
    // off the plot.
    let drawn: Vec<f64> = impedance
        .magnitude
        .iter()
        .map(|&m| if m.is_finite() { m } else { OPEN_PORT_OHMS })
        .collect();
    let title = if range.is_none() {
        warn!(circuit = circuit.id(), signal = %signal, "impedance infinite everywhere; port is open");
        format!("Impedance {} (open port)", signal)
    } else {
        format!("Impedance {}", signal)
    };
    let request = PlotRequest::new(title, "Frequency (Hz)", "|Z| (ohm)")
        .with_size(d.config().plot_width, d.config().plot_height)
        .with_x_scale(AxisScale::Log)
        .with_y_scale(AxisScale::Log)
        .with_series(Series::new(signal, impedance.frequencies.clone(), drawn));
    let plot = d.render(&request, format)?;
    Ok(response.with_plot(&plot))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot_args(extra: Value) -> Value {
        let mut args = json!({
            "signals": ["v(out)"],
            "image_format": "png",
            "output_format": ["image"],
            "options": {"title": "t", "x_label": "x", "y_label": "y"},
        });
        if let (Some(base), Some(extra)) = (args.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        args
    }

    #[test]
    fn test_svg_output_needs_svg_image() {
        let err = parse_args::<PlotResultsArgs>("plot_results", plot_args(json!({"output_format": ["svg"]})))
            .unwrap_err();
        assert!(err.to_string().contains("requires image_format 'svg'"));

        let ok = parse_args::<PlotResultsArgs>(
            "plot_results",
            plot_args(json!({"image_format": "svg", "output_format": ["image", "svg", "data"]})),
        )
        .unwrap();
        assert_eq!(
            ok.formats().unwrap().1,
            vec![OutputFormat::Image, OutputFormat::Svg, OutputFormat::Data]
        );
    }

    #[test]
    fn test_options_title_required() {
        let err = parse_args::<PlotResultsArgs>(
            "plot_results",
            plot_args(json!({"options": {"x_label": "x", "y_label": "y"}})),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument 'title': title is required");
    }

    #[test]
    fn test_invert_must_be_plotted() {
        let err = parse_args::<PlotResultsArgs>("plot_results", plot_args(json!({"invert_signals": ["v(in)"]})))
            .unwrap_err();
        assert!(err.to_string().contains("v(in)"));
    }

    #[test]
    fn test_ac_series_in_db() {
        let result = CachedAnalysisResult::builder(AnalysisKind::Ac, "frequency", vec![1.0, 10.0])
            .complex_signal("v(out)", vec![1.0, 0.0], vec![0.0, 0.1])
            .build()
            .unwrap();
        let series = signal_series(&result, "v(out)", true).unwrap();
        assert_eq!(series.name, "-v(out)");
        assert!(series.y[0].abs() < 1e-12);
        assert!((series.y[1] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_impedance_defaults() {
        let args: PlotImpedanceArgs =
            parse_args("plot_impedance", json!({"port_positive": "in", "port_negative": "0"})).unwrap();
        let sweep = args.sweep().unwrap();
        assert_eq!((sweep.start, sweep.stop, sweep.points), (10.0, 1e6, 20));
        assert_eq!(args.format(ImageFormat::Svg).unwrap(), ImageFormat::Svg);
    }
}
